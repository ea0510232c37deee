//! Observation (sensor) models
//!
//! Lidar observes position directly (a linear function of state); radar
//! observes range, bearing, and range-rate (a nonlinear function of state).

use nalgebra::RealField;
use num_traits::Float;

use super::NEAR_ZERO_TOLERANCE;
use crate::types::spaces::{Measurement, MeasurementCovariance, StateVector};
use crate::types::transforms::ObservationMatrix;

// ============================================================================
// Lidar
// ============================================================================

/// Lidar sensor: observes `[px, py]` from the state `[px, py, v, yaw, yawd]`.
///
/// The measurement is linear in the state, so the lidar update is a standard
/// Kalman correction and no sigma points are involved.
#[derive(Debug, Clone)]
pub struct LidarSensor<T: RealField> {
    /// X position measurement noise standard deviation (m)
    pub sigma_px: T,
    /// Y position measurement noise standard deviation (m)
    pub sigma_py: T,
}

impl<T: RealField + Float + Copy> LidarSensor<T> {
    /// Creates a new lidar sensor model.
    ///
    /// # Panics
    /// Panics if either noise parameter is non-positive.
    pub fn new(sigma_px: T, sigma_py: T) -> Self {
        assert!(
            sigma_px > T::zero(),
            "Measurement noise sigma_px must be positive"
        );
        assert!(
            sigma_py > T::zero(),
            "Measurement noise sigma_py must be positive"
        );
        Self { sigma_px, sigma_py }
    }

    /// Returns the fixed observation matrix selecting `[px, py]`.
    pub fn observation_matrix(&self) -> ObservationMatrix<T, 2, 5> {
        let one = T::one();
        let zero = T::zero();

        ObservationMatrix::from_matrix(nalgebra::matrix![
            one, zero, zero, zero, zero;
            zero, one, zero, zero, zero
        ])
    }

    /// Returns the measurement noise covariance R.
    pub fn measurement_noise(&self) -> MeasurementCovariance<T, 2> {
        let zero = T::zero();
        let sigma_px_sq = self.sigma_px * self.sigma_px;
        let sigma_py_sq = self.sigma_py * self.sigma_py;

        MeasurementCovariance::from_matrix(nalgebra::matrix![
            sigma_px_sq, zero;
            zero, sigma_py_sq
        ])
    }
}

// ============================================================================
// Radar
// ============================================================================

/// Radar sensor: observes `[range, bearing, range_rate]`.
///
/// - range = sqrt(px² + py²)
/// - bearing = atan2(py, px)
/// - range_rate = (px·v·cos(yaw) + py·v·sin(yaw)) / range
///
/// The measurement is nonlinear in the state, so the radar update reuses the
/// unscented transform in measurement space via [`RadarSensor::observe`].
#[derive(Debug, Clone)]
pub struct RadarSensor<T: RealField> {
    /// Range measurement noise standard deviation (m)
    pub sigma_range: T,
    /// Bearing measurement noise standard deviation (rad)
    pub sigma_bearing: T,
    /// Range-rate measurement noise standard deviation (m/s)
    pub sigma_range_rate: T,
}

impl<T: RealField + Float + Copy> RadarSensor<T> {
    /// Creates a new radar sensor model.
    ///
    /// # Panics
    /// Panics if any noise parameter is non-positive.
    pub fn new(sigma_range: T, sigma_bearing: T, sigma_range_rate: T) -> Self {
        assert!(
            sigma_range > T::zero(),
            "Measurement noise sigma_range must be positive"
        );
        assert!(
            sigma_bearing > T::zero(),
            "Measurement noise sigma_bearing must be positive"
        );
        assert!(
            sigma_range_rate > T::zero(),
            "Measurement noise sigma_range_rate must be positive"
        );
        Self {
            sigma_range,
            sigma_bearing,
            sigma_range_rate,
        }
    }

    /// Returns the measurement noise covariance R.
    pub fn measurement_noise(&self) -> MeasurementCovariance<T, 3> {
        let zero = T::zero();
        let sigma_r_sq = self.sigma_range * self.sigma_range;
        let sigma_b_sq = self.sigma_bearing * self.sigma_bearing;
        let sigma_rd_sq = self.sigma_range_rate * self.sigma_range_rate;

        MeasurementCovariance::from_matrix(nalgebra::matrix![
            sigma_r_sq, zero, zero;
            zero, sigma_b_sq, zero;
            zero, zero, sigma_rd_sq
        ])
    }

    /// Maps a state into `[range, bearing, range_rate]` measurement space.
    ///
    /// Returns `None` when the target is closer to the sensor origin than the
    /// near-zero tolerance: the range-rate division is undefined there.
    pub fn observe(&self, state: &StateVector<T, 5>) -> Option<Measurement<T, 3>> {
        let px = *state.index(0);
        let py = *state.index(1);
        let v = *state.index(2);
        let yaw = *state.index(3);

        let range = Float::sqrt(px * px + py * py);
        if range < T::from_f64(NEAR_ZERO_TOLERANCE).unwrap() {
            return None;
        }

        let bearing = Float::atan2(py, px);
        let range_rate = (px * v * Float::cos(yaw) + py * v * Float::sin(yaw)) / range;

        Some(Measurement::from_array([range, bearing, range_rate]))
    }
}
