//! Node identifiers and oriented node pairs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a parcellation node (anatomical region).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connectome edge expressed with an explicit orientation.
///
/// Equality is ordered: `(a, b)` and `(b, a)` describe the same edge but are
/// not equal. Use [`NodePair::canonical`] for an orientation-free key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodePair {
    pub first: NodeId,
    pub second: NodeId,
}

/// How a streamline's node pair relates to an exemplar's node pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Orientation {
    /// Same first/second order.
    Forward,
    /// Exactly reversed order; points must be walked back-to-front.
    Reversed,
    /// A different edge altogether.
    Mismatch,
}

impl NodePair {
    #[must_use]
    pub const fn new(first: u32, second: u32) -> Self {
        Self::from_ids(NodeId::new(first), NodeId::new(second))
    }

    #[must_use]
    pub const fn from_ids(first: NodeId, second: NodeId) -> Self {
        Self { first, second }
    }

    /// The same edge with first and second swapped.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            first: self.second,
            second: self.first,
        }
    }

    /// A self-connection (`first == second`).
    #[must_use]
    pub fn is_diagonal(self) -> bool {
        self.first == self.second
    }

    /// Orientation-free key: the smaller node id first.
    #[must_use]
    pub fn canonical(self) -> Self {
        if self.first <= self.second {
            self
        } else {
            self.reversed()
        }
    }

    /// Classifies `other` against this pair.
    #[must_use]
    pub fn orientation_of(self, other: Self) -> Orientation {
        if other == self {
            Orientation::Forward
        } else if other == self.reversed() {
            Orientation::Reversed
        } else {
            Orientation::Mismatch
        }
    }
}

impl fmt::Display for NodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeId, NodePair, Orientation};

    #[test]
    fn orientation_is_classified() {
        let pair = NodePair::new(3, 7);
        assert_eq!(pair.orientation_of(NodePair::new(3, 7)), Orientation::Forward);
        assert_eq!(pair.orientation_of(NodePair::new(7, 3)), Orientation::Reversed);
        assert_eq!(pair.orientation_of(NodePair::new(3, 8)), Orientation::Mismatch);
        assert_eq!(pair.orientation_of(NodePair::new(3, 3)), Orientation::Mismatch);
    }

    #[test]
    fn diagonal_pair_is_always_forward() {
        let pair = NodePair::new(4, 4);
        assert!(pair.is_diagonal());
        assert_eq!(pair.orientation_of(pair.reversed()), Orientation::Forward);
    }

    #[test]
    fn canonical_orders_by_id() {
        assert_eq!(NodePair::new(9, 2).canonical(), NodePair::new(2, 9));
        assert_eq!(NodePair::new(2, 9).canonical(), NodePair::new(2, 9));
        assert_eq!(
            NodePair::from_ids(NodeId::new(5), NodeId::new(1)).reversed(),
            NodePair::new(1, 5)
        );
    }

    #[test]
    fn display_names_both_nodes() {
        assert_eq!(NodePair::new(1, 12).to_string(), "(1, 12)");
        assert_eq!(NodeId::new(0).to_string(), "0");
    }
}
