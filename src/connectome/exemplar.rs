//! Per-edge exemplar accumulation and finalization.
//!
//! An [`Exemplar`] collects every streamline assigned to one connectome edge
//! into a fixed number of slots holding weighted position sums. Finalization
//! turns those sums into the representative curve:
//!
//! 1. divide by the total weight (weighted mean per slot),
//! 2. blend the first and last slots toward the node centroids,
//! 3. resample to a fixed arc-length step.
//!
//! Edges without any weight, and self-connections, finalize to the straight
//! segment between the two centroids.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::node::{NodePair, Orientation};
use super::options::ExemplarOptions;
use super::streamline::InputStreamline;
use super::{ExemplarError, ExemplarOperation};
use crate::geom::{FixedStepOptions, Point3, ResampleError, resample_fixed_step, sample_at_index};

/// An accumulator for the streamlines of one connectome edge.
///
/// Implementations serialize their own mutations, so a single accumulator can
/// be shared between producer threads.
pub trait EdgeAccumulator: Send + Sync {
    /// The edge, in the orientation the accumulator was created with.
    fn nodes(&self) -> NodePair;

    /// Folds one streamline into the running weighted sum.
    ///
    /// # Errors
    /// See [`Exemplar::add`].
    fn add(&self, streamline: &InputStreamline) -> Result<(), ExemplarError>;

    /// Converts the accumulated sums into the final curve. Called once.
    ///
    /// # Errors
    /// See [`Exemplar::finalize`].
    fn finalize(&self, step_size: f64) -> Result<FinalizeDiagnostics, ExemplarError>;
}

// ============================================================================
// Accumulation buffer
// ============================================================================

/// Fixed-length weighted position sums.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationBuffer {
    sums: Vec<Point3>,
    weight: f64,
}

impl AccumulationBuffer {
    #[must_use]
    pub fn new(resolution: usize) -> Self {
        Self {
            sums: vec![Point3::ORIGIN; resolution],
            weight: 0.0,
        }
    }

    /// Weighted position sums, one per slot.
    #[must_use]
    pub fn sums(&self) -> &[Point3] {
        &self.sums
    }

    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sums.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Interpolates `streamline` onto the slots and adds it, scaled by its
    /// weight. Slot `i` reads the streamline at fractional index
    /// `(M - 1) * i / N`, mirrored to `M - 1 - t` when `reversed`.
    #[allow(clippy::cast_precision_loss)]
    pub fn accumulate(&mut self, streamline: &InputStreamline, reversed: bool) {
        let last = (streamline.len() - 1) as f64;
        let slots = self.sums.len() as f64;
        let weight = streamline.weight();
        for (i, slot) in self.sums.iter_mut().enumerate() {
            let mut t = last * i as f64 / slots;
            if reversed {
                t = last - t;
            }
            if let Some(sample) = sample_at_index(streamline.points(), t) {
                *slot += sample * weight;
            }
        }
        self.weight += weight;
    }
}

// ============================================================================
// Finalized curve
// ============================================================================

/// The emitted exemplar polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedCurve {
    points: Vec<Point3>,
    weight: f64,
}

impl FinalizedCurve {
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }

    /// Total weight of the streamlines that contributed.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Why an edge finalized to the straight centroid-to-centroid segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegenerateReason {
    /// No streamline weight was accumulated.
    NoWeight,
    /// The edge connects a node to itself.
    Diagonal,
}

/// Report of a single finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeDiagnostics {
    /// The finalized edge.
    pub nodes: NodePair,
    /// Total accumulated streamline weight.
    pub weight: f64,
    /// Number of accumulation slots.
    pub slot_count: usize,
    /// Points blended toward each centroid.
    pub converging_point_count: usize,
    /// Vertices in the emitted curve.
    pub output_point_count: usize,
    /// Vertices placed by bisection during resampling.
    pub bisection_count: usize,
    /// Arc length of the emitted curve.
    pub output_length: f64,
    /// Set when the straight-segment fallback was used.
    pub degenerate: Option<DegenerateReason>,
}

/// Converts accumulated sums into the final exemplar curve.
///
/// Pure: the buffer is left untouched.
///
/// # Errors
/// Returns [`ResampleError::InvalidStepSize`] if `step_size` is not finite and
/// strictly positive.
pub fn finalize_buffer(
    buffer: &AccumulationBuffer,
    nodes: NodePair,
    node_coms: (Point3, Point3),
    step_size: f64,
    options: &ExemplarOptions,
) -> Result<(FinalizedCurve, FinalizeDiagnostics), ResampleError> {
    let resample_options =
        FixedStepOptions::new(step_size).with_bisection_iterations(options.bisection_iterations);
    if !step_size.is_finite() || step_size <= 0.0 {
        return Err(ResampleError::InvalidStepSize(step_size));
    }

    let mut diagnostics = FinalizeDiagnostics {
        nodes,
        weight: buffer.weight(),
        slot_count: buffer.len(),
        converging_point_count: 0,
        output_point_count: 2,
        bisection_count: 0,
        output_length: node_coms.0.distance_to(node_coms.1),
        degenerate: None,
    };

    let degenerate = if nodes.is_diagonal() {
        Some(DegenerateReason::Diagonal)
    } else if buffer.weight() <= 0.0 {
        Some(DegenerateReason::NoWeight)
    } else {
        None
    };
    if let Some(reason) = degenerate {
        diagnostics.degenerate = Some(reason);
        let curve = FinalizedCurve {
            points: vec![node_coms.0, node_coms.1],
            weight: buffer.weight(),
        };
        return Ok((curve, diagnostics));
    }

    let multiplier = 1.0 / buffer.weight();
    let mut mean: Vec<Point3> = buffer.sums().iter().map(|p| *p * multiplier).collect();

    let converging = options.converging_point_count().min(mean.len() / 2);
    converge_endpoints(&mut mean, node_coms, converging);
    diagnostics.converging_point_count = converging;

    let (points, resampled) = resample_fixed_step(&mean, resample_options)?;
    diagnostics.output_point_count = resampled.output_point_count;
    diagnostics.bisection_count = resampled.bisection_count;
    diagnostics.output_length = resampled.output_length;

    let curve = FinalizedCurve {
        points,
        weight: buffer.weight(),
    };
    Ok((curve, diagnostics))
}

/// Blends the first and last `count` points toward the respective centroid.
///
/// Point `i` from the start becomes `mu * p + (1 - mu) * start` with
/// `mu = i / count`; the end is handled symmetrically. The outermost points
/// land exactly on the centroids.
#[allow(clippy::cast_precision_loss)]
fn converge_endpoints(points: &mut [Point3], node_coms: (Point3, Point3), count: usize) {
    if count == 0 {
        return;
    }
    let size = points.len();
    let denom = count as f64;
    for (i, point) in points.iter_mut().take(count).enumerate() {
        let mu = i as f64 / denom;
        *point = mu * *point + (1.0 - mu) * node_coms.0;
    }
    for (i, point) in points.iter_mut().enumerate().skip(size - count) {
        let mu = (size - 1 - i) as f64 / denom;
        *point = mu * *point + (1.0 - mu) * node_coms.1;
    }
}

// ============================================================================
// Exemplar
// ============================================================================

#[derive(Debug)]
enum ExemplarState {
    Accumulating(AccumulationBuffer),
    Finalized(FinalizedCurve),
}

/// The representative streamline of one connectome edge.
///
/// Streamlines are folded in with [`Exemplar::add`] (from any number of
/// threads) and the curve is produced by a single [`Exemplar::finalize`].
#[derive(Debug)]
pub struct Exemplar {
    nodes: NodePair,
    node_coms: (Point3, Point3),
    options: ExemplarOptions,
    state: Mutex<ExemplarState>,
}

impl Exemplar {
    /// Exemplar with `resolution` accumulation slots and default tunables.
    ///
    /// # Errors
    /// [`ExemplarError::InvalidResolution`] when `resolution < 2`.
    pub fn new(
        nodes: NodePair,
        node_coms: (Point3, Point3),
        resolution: usize,
    ) -> Result<Self, ExemplarError> {
        Self::with_options(nodes, node_coms, ExemplarOptions::new(resolution))
    }

    /// # Errors
    /// Any error from [`ExemplarOptions::validate`].
    pub fn with_options(
        nodes: NodePair,
        node_coms: (Point3, Point3),
        options: ExemplarOptions,
    ) -> Result<Self, ExemplarError> {
        options.validate()?;
        Ok(Self {
            nodes,
            node_coms,
            options,
            state: Mutex::new(ExemplarState::Accumulating(AccumulationBuffer::new(
                options.resolution,
            ))),
        })
    }

    #[must_use]
    pub const fn nodes(&self) -> NodePair {
        self.nodes
    }

    /// Centroids of `nodes.first` and `nodes.second`.
    #[must_use]
    pub const fn node_coms(&self) -> (Point3, Point3) {
        self.node_coms
    }

    #[must_use]
    pub const fn options(&self) -> &ExemplarOptions {
        &self.options
    }

    #[must_use]
    pub const fn resolution(&self) -> usize {
        self.options.resolution
    }

    /// Total weight accumulated so far.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match &*self.state.lock() {
            ExemplarState::Accumulating(buffer) => buffer.weight(),
            ExemplarState::Finalized(curve) => curve.weight(),
        }
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(&*self.state.lock(), ExemplarState::Finalized(_))
    }

    /// Current points: the raw weighted sums while accumulating, the final
    /// curve afterwards.
    #[must_use]
    pub fn points(&self) -> Vec<Point3> {
        match &*self.state.lock() {
            ExemplarState::Accumulating(buffer) => buffer.sums().to_vec(),
            ExemplarState::Finalized(curve) => curve.points().to_vec(),
        }
    }

    /// The final curve, once finalized.
    #[must_use]
    pub fn curve(&self) -> Option<FinalizedCurve> {
        match &*self.state.lock() {
            ExemplarState::Accumulating(_) => None,
            ExemplarState::Finalized(curve) => Some(curve.clone()),
        }
    }

    /// Folds `streamline` into the weighted sum.
    ///
    /// The streamline may be oriented either way relative to this exemplar;
    /// reversed streamlines are read back-to-front.
    ///
    /// # Errors
    /// [`ExemplarError::InvalidState`] after finalization and
    /// [`ExemplarError::NodeOrderMismatch`] when the streamline belongs to a
    /// different edge.
    pub fn add(&self, streamline: &InputStreamline) -> Result<(), ExemplarError> {
        let mut state = self.state.lock();
        let ExemplarState::Accumulating(buffer) = &mut *state else {
            return Err(ExemplarError::InvalidState {
                nodes: self.nodes,
                operation: ExemplarOperation::Add,
            });
        };
        let reversed = match self.nodes.orientation_of(streamline.nodes()) {
            Orientation::Forward => false,
            Orientation::Reversed => true,
            Orientation::Mismatch => {
                return Err(ExemplarError::NodeOrderMismatch {
                    expected: self.nodes,
                    found: streamline.nodes(),
                });
            }
        };
        buffer.accumulate(streamline, reversed);
        Ok(())
    }

    /// Produces the final curve, resampled to `step_size`.
    ///
    /// # Errors
    /// [`ExemplarError::InvalidState`] if already finalized and
    /// [`ExemplarError::InvalidStepSize`] for a step that is not finite and
    /// positive. Neither changes the exemplar.
    pub fn finalize(&self, step_size: f64) -> Result<FinalizeDiagnostics, ExemplarError> {
        let mut state = self.state.lock();
        let ExemplarState::Accumulating(buffer) = &*state else {
            return Err(ExemplarError::InvalidState {
                nodes: self.nodes,
                operation: ExemplarOperation::Finalize,
            });
        };

        let (curve, diagnostics) =
            finalize_buffer(buffer, self.nodes, self.node_coms, step_size, &self.options)
                .map_err(|err| match err {
                    ResampleError::InvalidStepSize(step_size) => ExemplarError::InvalidStepSize {
                        nodes: self.nodes,
                        step_size,
                    },
                })?;

        match diagnostics.degenerate {
            Some(reason) => log::debug!(
                "exemplar {}: {:?}, emitting straight segment between centroids",
                self.nodes,
                reason
            ),
            None => log::debug!(
                "exemplar {}: weight {} over {} slots resampled to {} points ({:.3} long)",
                self.nodes,
                diagnostics.weight,
                diagnostics.slot_count,
                diagnostics.output_point_count,
                diagnostics.output_length
            ),
        }

        *state = ExemplarState::Finalized(curve);
        Ok(diagnostics)
    }
}

impl EdgeAccumulator for Exemplar {
    fn nodes(&self) -> NodePair {
        self.nodes
    }

    fn add(&self, streamline: &InputStreamline) -> Result<(), ExemplarError> {
        Exemplar::add(self, streamline)
    }

    fn finalize(&self, step_size: f64) -> Result<FinalizeDiagnostics, ExemplarError> {
        Exemplar::finalize(self, step_size)
    }
}
