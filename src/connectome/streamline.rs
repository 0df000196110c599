//! Streamlines as delivered by the node assignment stage.

use super::ExemplarError;
use super::node::NodePair;
use crate::geom::Point3;

/// A weighted streamline assigned to a connectome edge.
///
/// `nodes` carries the orientation in which the streamline's endpoints touched
/// the two regions: `nodes.first` is the region at `points[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputStreamline {
    points: Vec<Point3>,
    weight: f64,
    nodes: NodePair,
}

impl InputStreamline {
    /// # Errors
    /// [`ExemplarError::TooFewPoints`] for fewer than two points,
    /// [`ExemplarError::NonFinitePoint`] for a NaN or infinite coordinate and
    /// [`ExemplarError::InvalidWeight`] for a negative or non-finite weight.
    pub fn new(points: Vec<Point3>, weight: f64, nodes: NodePair) -> Result<Self, ExemplarError> {
        if points.len() < 2 {
            return Err(ExemplarError::TooFewPoints {
                count: points.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(ExemplarError::NonFinitePoint { index });
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(ExemplarError::InvalidWeight(weight));
        }
        Ok(Self {
            points,
            weight,
            nodes,
        })
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub const fn nodes(&self) -> NodePair {
        self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: construction requires two points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The same streamline traced the other way: points back-to-front and the
    /// node pair swapped.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            points: self.points.iter().rev().copied().collect(),
            weight: self.weight,
            nodes: self.nodes.reversed(),
        }
    }
}
