//! Exemplar generation parameters.

use serde::{Deserialize, Serialize};

use super::ExemplarError;
use crate::geom::BISECTION_ITERATIONS;

/// Default fraction of the accumulated points, at each end, that is pulled
/// toward the node centroid during finalization.
///
/// Counted in points, not in arc length. Tunable through
/// [`ExemplarOptions::with_converge_fraction`].
pub const ENDPOINT_CONVERGE_FRACTION: f64 = 0.25;

const fn default_converge_fraction() -> f64 {
    ENDPOINT_CONVERGE_FRACTION
}

const fn default_bisection_iterations() -> usize {
    BISECTION_ITERATIONS
}

/// Options shared by every exemplar of a connectome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExemplarOptions {
    /// Number of accumulation slots (`N`) each streamline is interpolated onto.
    pub resolution: usize,
    /// Fraction of slots at each end blended toward the node centroid.
    #[serde(default = "default_converge_fraction")]
    pub converge_fraction: f64,
    /// Bisection halvings used when placing resampled vertices.
    #[serde(default = "default_bisection_iterations")]
    pub bisection_iterations: usize,
}

impl ExemplarOptions {
    /// Options with the given resolution and default tunables.
    #[must_use]
    pub const fn new(resolution: usize) -> Self {
        Self {
            resolution,
            converge_fraction: ENDPOINT_CONVERGE_FRACTION,
            bisection_iterations: BISECTION_ITERATIONS,
        }
    }

    /// Override the endpoint convergence fraction.
    #[must_use]
    pub const fn with_converge_fraction(mut self, fraction: f64) -> Self {
        self.converge_fraction = fraction;
        self
    }

    /// Override the bisection depth.
    #[must_use]
    pub const fn with_bisection_iterations(mut self, iterations: usize) -> Self {
        self.bisection_iterations = iterations;
        self
    }

    /// Number of points blended toward each centroid: `floor(fraction * N)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn converging_point_count(&self) -> usize {
        (self.converge_fraction * self.resolution as f64).floor() as usize
    }

    /// Checks that the options describe a usable accumulator.
    ///
    /// # Errors
    /// [`ExemplarError::InvalidResolution`] when fewer than two slots are
    /// requested; [`ExemplarError::InvalidConvergeFraction`] when the fraction
    /// is outside `[0, 0.5]` (the two ends would overlap).
    pub fn validate(&self) -> Result<(), ExemplarError> {
        if self.resolution < 2 {
            return Err(ExemplarError::InvalidResolution(self.resolution));
        }
        if !(0.0..=0.5).contains(&self.converge_fraction) {
            return Err(ExemplarError::InvalidConvergeFraction(self.converge_fraction));
        }
        Ok(())
    }
}
