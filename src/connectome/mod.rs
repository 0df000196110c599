//! Connectome edge exemplars.
//!
//! Every edge of a connectome (a pair of parcellation nodes) gets one
//! [`Exemplar`]: a single smooth polyline summarising all streamlines assigned
//! to that edge. Streamlines are accumulated in parallel through
//! [`Exemplar::add`] and the representative curve is produced by
//! [`Exemplar::finalize`]. An [`ExemplarBank`] owns the exemplars of a whole
//! connectome and routes streamlines to them by node pair.

mod bank;
mod exemplar;
mod node;
mod options;
mod streamline;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use bank::ExemplarBank;
pub use exemplar::{
    AccumulationBuffer, DegenerateReason, EdgeAccumulator, Exemplar, FinalizeDiagnostics,
    FinalizedCurve, finalize_buffer,
};
pub use node::{NodeId, NodePair, Orientation};
pub use options::{ENDPOINT_CONVERGE_FRACTION, ExemplarOptions};
pub use streamline::InputStreamline;

/// The exemplar operation that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExemplarOperation {
    Add,
    Finalize,
}

impl fmt::Display for ExemplarOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Finalize => f.write_str("finalize"),
        }
    }
}

/// Errors raised while building or finalizing exemplars.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExemplarError {
    #[error("cannot {operation} exemplar {nodes}: already finalized")]
    InvalidState {
        nodes: NodePair,
        operation: ExemplarOperation,
    },
    #[error("streamline assigned to {found} cannot contribute to exemplar {expected}")]
    NodeOrderMismatch { expected: NodePair, found: NodePair },
    #[error("streamline needs at least 2 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("streamline point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },
    #[error("streamline weight must be finite and non-negative, got {0}")]
    InvalidWeight(f64),
    #[error("exemplar resolution must be at least 2, got {0}")]
    InvalidResolution(usize),
    #[error("endpoint convergence fraction must lie in [0, 0.5], got {0}")]
    InvalidConvergeFraction(f64),
    #[error("invalid step size {step_size} for exemplar {nodes}")]
    InvalidStepSize { nodes: NodePair, step_size: f64 },
    #[error("no exemplar registered for edge {0}")]
    UnknownEdge(NodePair),
    #[error("exemplar for edge {0} already registered")]
    DuplicateEdge(NodePair),
}
