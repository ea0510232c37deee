//! CTRV transition (motion) model
//!
//! The constant-turn-rate-and-velocity model assumes the tracked object moves
//! along a circular arc with constant speed and constant yaw rate. The state
//! is `[px, py, v, yaw, yawd]`:
//!
//! - `px`, `py`: position (m)
//! - `v`: speed magnitude (m/s)
//! - `yaw`: heading angle (rad), kept in (-π, π]
//! - `yawd`: heading rate (rad/s)
//!
//! Process noise enters through two scalar accelerations, longitudinal
//! (`nu_a`) and yaw (`nu_yawdd`), which is why the unscented prediction
//! augments the state with those two noise dimensions instead of adding a
//! covariance Q after propagation.

use nalgebra::{RealField, SVector};
use num_traits::Float;

use super::NEAR_ZERO_TOLERANCE;

/// Constant-turn-rate-and-velocity motion model.
#[derive(Debug, Clone)]
pub struct CtrvModel<T: RealField> {
    /// Longitudinal acceleration noise standard deviation (m/s²)
    pub std_a: T,
    /// Yaw acceleration noise standard deviation (rad/s²)
    pub std_yawdd: T,
}

impl<T: RealField + Float + Copy> CtrvModel<T> {
    /// Creates a new CTRV model.
    ///
    /// # Arguments
    /// - `std_a`: longitudinal acceleration noise standard deviation (must be >= 0)
    /// - `std_yawdd`: yaw acceleration noise standard deviation (must be >= 0)
    ///
    /// # Panics
    /// Panics if either noise parameter is negative.
    pub fn new(std_a: T, std_yawdd: T) -> Self {
        assert!(
            std_a >= T::zero(),
            "Process noise std_a must be non-negative"
        );
        assert!(
            std_yawdd >= T::zero(),
            "Process noise std_yawdd must be non-negative"
        );
        Self { std_a, std_yawdd }
    }

    /// Returns the process-noise variances `(sigma_a^2, sigma_yawdd^2)` used
    /// to fill the two augmented diagonal entries.
    #[inline]
    pub fn process_noise_variances(&self) -> (T, T) {
        (self.std_a * self.std_a, self.std_yawdd * self.std_yawdd)
    }

    /// Propagates one augmented sigma point `[px, py, v, yaw, yawd, nu_a,
    /// nu_yawdd]` through the CTRV dynamics for time step `dt`, dropping the
    /// noise dimensions from the result.
    ///
    /// Near-zero yaw rate falls back to straight-line integration to avoid
    /// dividing by `yawd`.
    ///
    /// # Panics
    /// Panics if `dt < 0`.
    pub fn propagate(&self, point: &SVector<T, 7>, dt: T) -> SVector<T, 5> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");

        let px = point[0];
        let py = point[1];
        let v = point[2];
        let yaw = point[3];
        let yawd = point[4];
        let nu_a = point[5];
        let nu_yawdd = point[6];

        let yaw_next = yaw + yawd * dt;

        let (mut px_p, mut py_p) = if Float::abs(yawd) > T::from_f64(NEAR_ZERO_TOLERANCE).unwrap()
        {
            // Closed-form integration along the turn arc
            (
                px + v / yawd * (Float::sin(yaw_next) - Float::sin(yaw)),
                py + v / yawd * (Float::cos(yaw) - Float::cos(yaw_next)),
            )
        } else {
            // Degenerate turn rate: straight-line motion
            (
                px + v * dt * Float::cos(yaw),
                py + v * dt * Float::sin(yaw),
            )
        };

        let mut v_p = v;
        let mut yaw_p = yaw_next;
        let mut yawd_p = yawd;

        // Noise contributions: acceleration acts quadratically on position
        // and linearly on speed; yaw acceleration likewise on heading.
        let half = T::from_f64(0.5).unwrap();
        let dt2 = dt * dt;
        px_p += half * nu_a * dt2 * Float::cos(yaw);
        py_p += half * nu_a * dt2 * Float::sin(yaw);
        v_p += nu_a * dt;
        yaw_p += half * nu_yawdd * dt2;
        yawd_p += nu_yawdd * dt;

        SVector::from([px_p, py_p, v_p, yaw_p, yawd_p])
    }
}
