//! Angle normalization
//!
//! Heading and bearing residuals must be wrapped into (-π, π] before they
//! enter any outer product: near the ±π discontinuity an unwrapped residual
//! of almost 2π would corrupt the covariance. Every call site in the crate
//! (mean/covariance reduction, radar innovation covariance, cross-correlation,
//! radar innovation) uses this one function.

use nalgebra::RealField;
use num_traits::Float;

/// Wraps an angle into the half-open interval (-π, π].
///
/// The input may be any real number of radians; the output is the equivalent
/// angle in (-π, π]. Wrapping is idempotent.
pub fn normalize_angle<T: RealField + Float + Copy>(angle: T) -> T {
    let pi = T::from_f64(::core::f64::consts::PI).unwrap();
    let two_pi = pi + pi;

    let mut wrapped = angle;
    while wrapped > pi {
        wrapped -= two_pi;
    }
    while wrapped <= -pi {
        wrapped += two_pi;
    }
    wrapped
}
