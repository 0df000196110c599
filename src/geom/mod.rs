mod core;
mod polyline;

pub use self::core::{Point3, Tolerance, Transform};
pub use polyline::{
    BISECTION_ITERATIONS, FixedStepDiagnostics, FixedStepOptions, ResampleError,
    find_point_at_distance, polyline_length, resample_fixed_step, sample_at_index,
};
