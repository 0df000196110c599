//! Polyline sampling and fixed-step resampling.
//!
//! These are the geometric building blocks of exemplar generation:
//!
//! - **Continuous-index sampling**: reads a polyline at a fractional vertex
//!   index, interpolating linearly between neighbouring vertices.
//! - **Point at distance**: bisection along a segment for the point lying a
//!   given distance away from a reference point.
//! - **Fixed-step resampling**: re-expresses a polyline so that consecutive
//!   output vertices are one step apart, working outward from the middle
//!   vertex toward both ends.
//!
//! # Example
//!
//! ```
//! use connectome_exemplar::geom::{FixedStepOptions, Point3, resample_fixed_step};
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(4.0, 0.0, 0.0),
//!     Point3::new(8.0, 0.0, 0.0),
//! ];
//! let (resampled, diag) = resample_fixed_step(&points, FixedStepOptions::new(1.0)).unwrap();
//! assert_eq!(resampled.first(), points.first());
//! assert_eq!(resampled.last(), points.last());
//! assert_eq!(diag.output_point_count, resampled.len());
//! ```

use serde::{Deserialize, Serialize};

use super::core::Point3;

/// Default number of bisection halvings used to place each resampled vertex.
///
/// Six halvings bound the positional error to roughly 1/64 of the segment
/// being searched. Tunable through [`FixedStepOptions::with_bisection_iterations`].
pub const BISECTION_ITERATIONS: usize = 6;

/// Errors reported by fixed-step resampling.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ResampleError {
    #[error("resampling step size must be finite and positive, got {0}")]
    InvalidStepSize(f64),
}

/// Reads `points` at the fractional vertex index `t`.
///
/// `t` is clamped to `[0, len - 1]`. When the integer part of `t` is the last
/// vertex, that vertex is returned as-is; otherwise the result is
/// `(1 - mu) * points[lower] + mu * points[lower + 1]` with `mu` the fractional
/// part of `t`.
///
/// Returns `None` for an empty polyline.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn sample_at_index(points: &[Point3], t: f64) -> Option<Point3> {
    let last = points.len().checked_sub(1)?;
    let t = t.clamp(0.0, last as f64);
    let lower = t.floor() as usize;
    if lower >= last {
        return Some(points[last]);
    }
    let mu = t - lower as f64;
    Some(points[lower].lerp(points[lower + 1], mu))
}

/// Finds the point on segment `a -> b` whose distance to `reference` is
/// approximately `target_distance`.
///
/// Bisects the interpolation parameter `mu` in `[0, 1]` starting from the
/// segment midpoint. Candidates farther than the target lower the upper bound,
/// all others raise the lower bound. After `iterations` halvings the last
/// candidate is returned. Comparisons use squared distances.
///
/// The search assumes the distance to `reference` is below the target at `a`
/// and at or above it at `b`. [`resample_fixed_step`] keeps this by passing the
/// last accepted vertex as `a` once it already lies on the segment, and the
/// segment's first vertex only after skipping onto a new segment.
#[must_use]
pub fn find_point_at_distance(
    a: Point3,
    b: Point3,
    reference: Point3,
    target_distance: f64,
    iterations: usize,
) -> Point3 {
    let target_sq = target_distance * target_distance;
    let mut lower = 0.0_f64;
    let mut upper = 1.0_f64;
    let mut mu = 0.5_f64;
    let mut candidate = a.lerp(b, mu);
    for _ in 0..iterations {
        if candidate.distance_squared_to(reference) > target_sq {
            upper = mu;
        } else {
            lower = mu;
        }
        mu = 0.5 * (lower + upper);
        candidate = a.lerp(b, mu);
    }
    candidate
}

/// Total arc length of an open polyline.
#[must_use]
pub fn polyline_length(points: &[Point3]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(pair[1]))
        .sum()
}

// ============================================================================
// Fixed-step resampling
// ============================================================================

/// Options for fixed-step resampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedStepOptions {
    /// Target distance between consecutive output vertices.
    pub step_size: f64,
    /// Bisection halvings used to place each interpolated vertex.
    pub bisection_iterations: usize,
}

impl FixedStepOptions {
    /// Create new options with the given step size.
    #[must_use]
    pub const fn new(step_size: f64) -> Self {
        Self {
            step_size,
            bisection_iterations: BISECTION_ITERATIONS,
        }
    }

    /// Override the bisection depth.
    #[must_use]
    pub const fn with_bisection_iterations(mut self, iterations: usize) -> Self {
        self.bisection_iterations = iterations;
        self
    }
}

/// Diagnostics for fixed-step resampling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedStepDiagnostics {
    /// Number of input points.
    pub input_point_count: usize,
    /// Number of output points.
    pub output_point_count: usize,
    /// Number of vertices placed by bisection (all others are input vertices).
    pub bisection_count: usize,
    /// Arc length of the resampled polyline.
    pub output_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    Backward,
    Forward,
}

impl Arm {
    /// Next vertex index in this arm's direction, if any.
    const fn next(self, index: usize, last_index: usize) -> Option<usize> {
        match self {
            Self::Backward => index.checked_sub(1),
            Self::Forward => {
                if index < last_index {
                    Some(index + 1)
                } else {
                    None
                }
            }
        }
    }
}

/// Resamples `points` so consecutive output vertices are `step_size` apart.
///
/// The walk starts at vertex `(len + 1) / 2` and runs two arms, first toward
/// the start and then toward the end of the polyline. In each arm input
/// vertices closer than one step to the last accepted vertex are skipped; the
/// next vertex is then located by bisection on the segment that crosses the
/// step distance. Each arm ends by accepting the boundary vertex verbatim, so
/// the first and last input vertices are always preserved and only the two
/// boundary segments may be shorter than one step.
///
/// When the last accepted vertex lies on the segment being searched, the
/// bisection starts from that vertex rather than from the segment start, which
/// keeps every search interval monotone in distance and guarantees progress.
///
/// # Errors
/// Returns [`ResampleError::InvalidStepSize`] if `step_size` is not finite and
/// strictly positive.
pub fn resample_fixed_step(
    points: &[Point3],
    options: FixedStepOptions,
) -> Result<(Vec<Point3>, FixedStepDiagnostics), ResampleError> {
    let step_size = options.step_size;
    if !step_size.is_finite() || step_size <= 0.0 {
        return Err(ResampleError::InvalidStepSize(step_size));
    }

    let mut diagnostics = FixedStepDiagnostics {
        input_point_count: points.len(),
        ..Default::default()
    };

    if points.len() < 2 {
        let result = points.to_vec();
        diagnostics.output_point_count = result.len();
        return Ok((result, diagnostics));
    }

    let last_index = points.len() - 1;
    let mid = ((points.len() + 1) / 2).min(last_index);
    let step_sq = step_size * step_size;

    let mut vertices = vec![points[mid]];
    for arm in [Arm::Backward, Arm::Forward] {
        if arm == Arm::Forward {
            // Backward vertices were collected end-first.
            vertices.reverse();
        }

        let mut index = mid;
        let mut last = points[mid];
        loop {
            let mut skipped = false;
            while let Some(next) = arm.next(index, last_index) {
                if points[next].distance_squared_to(last) >= step_sq {
                    break;
                }
                index = next;
                skipped = true;
            }

            let Some(next) = arm.next(index, last_index) else {
                if points[index] != last {
                    vertices.push(points[index]);
                }
                break;
            };

            // `last` is on the segment unless we skipped onto a new one.
            let from = if skipped { points[index] } else { last };
            let vertex = find_point_at_distance(
                from,
                points[next],
                last,
                step_size,
                options.bisection_iterations,
            );
            diagnostics.bisection_count += 1;
            vertices.push(vertex);
            last = vertex;
        }
    }

    diagnostics.output_point_count = vertices.len();
    diagnostics.output_length = polyline_length(&vertices);
    Ok((vertices, diagnostics))
}
