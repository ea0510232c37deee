//! Unscented Kalman Filter core for the CTRV motion model
//!
//! The UKF propagates mean and covariance through nonlinear functions with a
//! deterministic set of weighted sample vectors (sigma points) instead of
//! Jacobians. Because the CTRV process noise is non-additive (two noise
//! accelerations enter the dynamics directly), the state is augmented to
//! 7 dimensions before sampling, giving 2·7+1 = 15 sigma points.
//!
//! # Prediction
//!
//! 1. [`UnscentedCtrvFilter::generate_sigma_points`]: sample the augmented
//!    distribution (Cholesky factor of the augmented covariance)
//! 2. [`UnscentedCtrvFilter::predict_sigma_points`]: push every point through
//!    the CTRV dynamics
//! 3. [`UnscentedCtrvFilter::predict_mean_and_covariance`]: weighted
//!    recombination with heading residuals wrapped to (-π, π]
//!
//! # Correction
//!
//! Lidar observes position linearly, so its update is a plain Kalman
//! correction. Radar observes (range, bearing, range-rate), so the predicted
//! sigma points are mapped into measurement space and recombined there.

use nalgebra::{Cholesky, RealField, SMatrix, SVector};
use num_traits::Float;

use crate::models::{CtrvModel, LidarSensor, RadarSensor};
use crate::types::angles::normalize_angle;
use crate::types::spaces::{
    ComputeInnovation, Measurement, StateCovariance, StateVector,
};
use crate::types::transforms::{
    compute_innovation_covariance, compute_kalman_gain, covariance_update,
};
use crate::{Error, Result};

/// State dimension: `[px, py, v, yaw, yawd]`
pub const N_X: usize = 5;

/// Augmented dimension: state plus the two process-noise accelerations
pub const N_AUG: usize = 7;

/// Number of sigma points: 2 * N_AUG + 1
pub const N_SIGMA: usize = 2 * N_AUG + 1;

/// Spreading parameter λ = 3 - N_AUG
pub const LAMBDA: f64 = 3.0 - N_AUG as f64;

/// Sigma point set produced by one prediction cycle, with one propagated
/// state per column. The radar update reuses this set, so [`predict`]
/// returns it alongside the predicted moments.
///
/// [`predict`]: UnscentedCtrvFilter::predict
pub type PredictedSigmaPoints<T> = SMatrix<T, N_X, N_SIGMA>;

/// Augmented sigma point set, one 7-dimensional point per column.
pub type AugmentedSigmaPoints<T> = SMatrix<T, N_AUG, N_SIGMA>;

#[inline]
fn lambda<T: RealField + Float + Copy>() -> T {
    T::from_f64(LAMBDA).unwrap()
}

/// Computes the 15 sigma point weights.
///
/// weight\[0\] = λ/(λ+n_aug), the rest 1/(2(λ+n_aug)); they sum to 1 for any
/// λ derived from n_aug = 7 (here λ = -4, so weight\[0\] is negative).
pub fn sigma_weights<T: RealField + Float + Copy>() -> SVector<T, N_SIGMA> {
    let denom = lambda::<T>() + T::from_usize(N_AUG).unwrap();
    let mut weights = SVector::from_element(T::from_f64(0.5).unwrap() / denom);
    weights[0] = lambda::<T>() / denom;
    weights
}

// ============================================================================
// Filter State
// ============================================================================

/// Belief state of the filter: mean and covariance of the CTRV state.
///
/// Prediction and correction consume one `UkfState` and produce a new one,
/// keeping "predicted this cycle" and "posterior after correction" as two
/// separate values.
#[derive(Debug, Clone, PartialEq)]
pub struct UkfState<T: RealField> {
    /// State estimate mean `[px, py, v, yaw, yawd]`
    pub mean: StateVector<T, N_X>,
    /// State estimate covariance
    pub covariance: StateCovariance<T, N_X>,
}

impl<T: RealField + Copy> UkfState<T> {
    /// Creates a new belief state.
    #[inline]
    pub fn new(mean: StateVector<T, N_X>, covariance: StateCovariance<T, N_X>) -> Self {
        Self { mean, covariance }
    }

    /// Creates a state with identity covariance.
    #[inline]
    pub fn with_identity_covariance(mean: StateVector<T, N_X>) -> Self {
        Self {
            mean,
            covariance: StateCovariance::identity(),
        }
    }

    /// Returns the trace of the covariance matrix (sum of variances).
    #[inline]
    pub fn uncertainty(&self) -> T {
        self.covariance.trace()
    }
}

// ============================================================================
// Unscented CTRV Filter
// ============================================================================

/// Unscented Kalman Filter over the CTRV motion model with lidar and radar
/// sensor models.
///
/// The filter itself is stateless: every method maps an input belief to an
/// output belief, and all scratch matrices are local to the call. One
/// instance can therefore serve any number of independent tracks, though each
/// track needs its own [`UkfState`].
#[derive(Debug, Clone)]
pub struct UnscentedCtrvFilter<T: RealField> {
    /// CTRV motion model
    pub motion: CtrvModel<T>,
    /// Lidar sensor model (linear update)
    pub lidar: LidarSensor<T>,
    /// Radar sensor model (unscented update)
    pub radar: RadarSensor<T>,
    /// Sigma point weights, fixed by λ and n_aug
    weights: SVector<T, N_SIGMA>,
}

impl<T: RealField + Float + Copy> UnscentedCtrvFilter<T> {
    /// Creates a new filter from its three models.
    pub fn new(motion: CtrvModel<T>, lidar: LidarSensor<T>, radar: RadarSensor<T>) -> Self {
        Self {
            motion,
            lidar,
            radar,
            weights: sigma_weights(),
        }
    }

    /// Returns the sigma point weights.
    #[inline]
    pub fn weights(&self) -> &SVector<T, N_SIGMA> {
        &self.weights
    }

    /// Samples the augmented state distribution.
    ///
    /// Builds the augmented mean `[x; 0; 0]` and the block-diagonal augmented
    /// covariance `blkdiag(P, diag(σ_a², σ_yawdd²))`, then places the 15
    /// points symmetrically along the columns of the Cholesky factor scaled
    /// by √(λ+n_aug).
    ///
    /// # Errors
    /// [`Error::NumericalInstability`] if the augmented covariance is not
    /// positive definite, which signals numerical divergence of the filter.
    pub fn generate_sigma_points(&self, state: &UkfState<T>) -> Result<AugmentedSigmaPoints<T>> {
        let mut x_aug = SVector::<T, N_AUG>::zeros();
        for i in 0..N_X {
            x_aug[i] = *state.mean.index(i);
        }

        let mut p_aug = SMatrix::<T, N_AUG, N_AUG>::zeros();
        let p = state.covariance.as_matrix();
        for i in 0..N_X {
            for j in 0..N_X {
                p_aug[(i, j)] = p[(i, j)];
            }
        }
        let (var_a, var_yawdd) = self.motion.process_noise_variances();
        p_aug[(N_X, N_X)] = var_a;
        p_aug[(N_X + 1, N_X + 1)] = var_yawdd;

        let factor = Cholesky::new(p_aug)
            .ok_or(Error::NumericalInstability)?
            .l();
        let scale = Float::sqrt(lambda::<T>() + T::from_usize(N_AUG).unwrap());

        let mut points = AugmentedSigmaPoints::zeros();
        points.set_column(0, &x_aug);
        for i in 0..N_AUG {
            points.set_column(i + 1, &(x_aug + factor.column(i) * scale));
            points.set_column(i + 1 + N_AUG, &(x_aug - factor.column(i) * scale));
        }

        Ok(points)
    }

    /// Propagates every augmented sigma point through the CTRV dynamics,
    /// dropping the two noise dimensions from the result.
    pub fn predict_sigma_points(
        &self,
        augmented: &AugmentedSigmaPoints<T>,
        dt: T,
    ) -> PredictedSigmaPoints<T> {
        let mut predicted = PredictedSigmaPoints::zeros();
        for i in 0..N_SIGMA {
            let point = augmented.column(i).into_owned();
            predicted.set_column(i, &self.motion.propagate(&point, dt));
        }
        predicted
    }

    /// Recombines propagated sigma points into the predicted mean and
    /// covariance.
    ///
    /// Every heading residual is wrapped to (-π, π] before its outer product;
    /// an unwrapped residual near the ±π discontinuity would corrupt the
    /// covariance. The mean heading is wrapped as well.
    pub fn predict_mean_and_covariance(&self, predicted: &PredictedSigmaPoints<T>) -> UkfState<T> {
        let mut x = SVector::<T, N_X>::zeros();
        for i in 0..N_SIGMA {
            x += predicted.column(i) * self.weights[i];
        }

        let mut p = SMatrix::<T, N_X, N_X>::zeros();
        for i in 0..N_SIGMA {
            let mut x_diff = predicted.column(i) - x;
            x_diff[3] = normalize_angle(x_diff[3]);
            p += x_diff * x_diff.transpose() * self.weights[i];
        }

        x[3] = normalize_angle(x[3]);
        UkfState::new(StateVector::from_svector(x), StateCovariance::from_matrix(p))
    }

    /// Runs one full prediction cycle: sample, propagate, recombine.
    ///
    /// Returns the predicted belief together with the propagated sigma point
    /// set, which the radar correction of the same cycle reuses.
    ///
    /// # Errors
    /// [`Error::NumericalInstability`] from sigma point generation; the input
    /// belief is untouched in that case.
    pub fn predict(
        &self,
        state: &UkfState<T>,
        dt: T,
    ) -> Result<(UkfState<T>, PredictedSigmaPoints<T>)> {
        let augmented = self.generate_sigma_points(state)?;
        let predicted_points = self.predict_sigma_points(&augmented, dt);
        let predicted = self.predict_mean_and_covariance(&predicted_points);
        Ok((predicted, predicted_points))
    }

    /// Corrects a predicted belief with a lidar measurement `[px, py]`.
    ///
    /// Lidar observes position linearly, so this is a standard Kalman
    /// correction with the fixed observation matrix H:
    /// S = H·P·Hᵗ + R, K = P·Hᵗ·S⁻¹, x ← x + K·y, P ← (I − K·H)·P.
    /// Position components carry no angle, so nothing is wrapped here.
    ///
    /// # Errors
    /// [`Error::SingularInnovation`] if S cannot be inverted.
    pub fn update_lidar(
        &self,
        predicted: &UkfState<T>,
        measurement: &Measurement<T, 2>,
    ) -> Result<UkfState<T>> {
        let h = self.lidar.observation_matrix();
        let r = self.lidar.measurement_noise();

        let predicted_meas = h.observe(&predicted.mean);
        let innovation = (*measurement).innovation(predicted_meas);

        let s = compute_innovation_covariance(&predicted.covariance, &h, &r);
        let gain = compute_kalman_gain(&predicted.covariance, &h, &s)
            .ok_or(Error::SingularInnovation)?;

        let correction = gain.correct(&innovation);
        let mean =
            StateVector::from_svector(predicted.mean.as_svector() + correction.as_svector());
        let covariance = covariance_update(&predicted.covariance, &gain, &h);

        Ok(UkfState::new(mean, covariance))
    }

    /// Corrects a predicted belief with a radar measurement
    /// `[range, bearing, range_rate]`.
    ///
    /// The unscented transform is reused in measurement space: the predicted
    /// sigma points from the same cycle are mapped through the radar model
    /// and recombined there. Bearing and heading residuals are wrapped to
    /// (-π, π] before every outer product, as is the innovation bearing.
    ///
    /// # Errors
    /// - [`Error::NumericalInstability`] if any sigma point sits closer to
    ///   the sensor origin than the near-zero tolerance (the range-rate
    ///   division is undefined there)
    /// - [`Error::SingularInnovation`] if S cannot be inverted
    pub fn update_radar(
        &self,
        predicted: &UkfState<T>,
        predicted_points: &PredictedSigmaPoints<T>,
        measurement: &Measurement<T, 3>,
    ) -> Result<UkfState<T>> {
        // Map sigma points into measurement space
        let mut zsig = SMatrix::<T, 3, N_SIGMA>::zeros();
        for i in 0..N_SIGMA {
            let point = StateVector::from_svector(predicted_points.column(i).into_owned());
            let mapped = self
                .radar
                .observe(&point)
                .ok_or(Error::NumericalInstability)?;
            zsig.set_column(i, mapped.as_svector());
        }

        // Predicted measurement mean
        let mut z_pred = SVector::<T, 3>::zeros();
        for i in 0..N_SIGMA {
            z_pred += zsig.column(i) * self.weights[i];
        }

        // Innovation covariance S, seeded with the measurement noise R
        let mut s = *self.radar.measurement_noise().as_matrix();
        for i in 0..N_SIGMA {
            let mut z_diff = zsig.column(i) - z_pred;
            z_diff[1] = normalize_angle(z_diff[1]);
            s += z_diff * z_diff.transpose() * self.weights[i];
        }

        // Cross-correlation between state and measurement space
        let mut tc = SMatrix::<T, N_X, 3>::zeros();
        for i in 0..N_SIGMA {
            let mut z_diff = zsig.column(i) - z_pred;
            z_diff[1] = normalize_angle(z_diff[1]);

            let mut x_diff = predicted_points.column(i) - predicted.mean.as_svector();
            x_diff[3] = normalize_angle(x_diff[3]);

            tc += x_diff * z_diff.transpose() * self.weights[i];
        }

        let s_inv = s.try_inverse().ok_or(Error::SingularInnovation)?;
        let gain = tc * s_inv;

        let mut innovation = measurement.as_svector() - z_pred;
        innovation[1] = normalize_angle(innovation[1]);

        let mut mean = predicted.mean.as_svector() + gain * innovation;
        mean[3] = normalize_angle(mean[3]);
        let covariance = predicted.covariance.as_matrix() - gain * s * gain.transpose();

        Ok(UkfState::new(
            StateVector::from_svector(mean),
            StateCovariance::from_matrix(covariance),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    fn make_filter() -> UnscentedCtrvFilter<f64> {
        UnscentedCtrvFilter::new(
            CtrvModel::new(3.8, 0.3),
            LidarSensor::new(0.15, 0.15),
            RadarSensor::new(0.3, 0.03, 0.3),
        )
    }

    #[test]
    fn test_weights_sum_to_one() {
        let weights: SVector<f64, N_SIGMA> = sigma_weights();

        assert_relative_eq!(weights.sum(), 1.0, epsilon = 1e-12);
        // lambda = -4, so the central weight is -4/3 and the rest are 1/6
        assert_relative_eq!(weights[0], -4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(weights[1], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sigma_points_reconstruct_augmented_moments() {
        // Weighted recombination of the raw sigma points must reproduce the
        // augmented mean and covariance exactly (up to numerical tolerance).
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([5.0, -2.0, 3.0, 0.4, -0.1]),
            StateCovariance::from_diagonal(&nalgebra::vector![2.0, 1.5, 1.0, 0.3, 0.1]),
        );

        let points = filter.generate_sigma_points(&state).unwrap();
        let weights = filter.weights();

        // Central column is the augmented mean
        for i in 0..N_X {
            assert_relative_eq!(points[(i, 0)], *state.mean.index(i), epsilon = 1e-12);
        }
        assert_relative_eq!(points[(5, 0)], 0.0);
        assert_relative_eq!(points[(6, 0)], 0.0);

        // Weighted mean
        let mut mean = SVector::<f64, N_AUG>::zeros();
        for i in 0..N_SIGMA {
            mean += points.column(i) * weights[i];
        }
        for i in 0..N_X {
            assert_relative_eq!(mean[i], *state.mean.index(i), epsilon = 1e-9);
        }
        assert_relative_eq!(mean[5], 0.0, epsilon = 1e-9);
        assert_relative_eq!(mean[6], 0.0, epsilon = 1e-9);

        // Weighted covariance
        let mut cov = SMatrix::<f64, N_AUG, N_AUG>::zeros();
        for i in 0..N_SIGMA {
            let diff = points.column(i) - mean;
            cov += diff * diff.transpose() * weights[i];
        }
        let (var_a, var_yawdd) = filter.motion.process_noise_variances();
        for i in 0..N_AUG {
            for j in 0..N_AUG {
                let expected = if i != j {
                    0.0
                } else if i < N_X {
                    state.covariance.as_matrix()[(i, i)]
                } else if i == N_X {
                    var_a
                } else {
                    var_yawdd
                };
                assert_relative_eq!(cov[(i, j)], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_indefinite_covariance_is_reported() {
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([0.0, 0.0, 0.0, 0.0, 0.0]),
            StateCovariance::from_diagonal(&nalgebra::vector![1.0, -1.0, 1.0, 1.0, 1.0]),
        );

        assert_eq!(
            filter.generate_sigma_points(&state).unwrap_err(),
            Error::NumericalInstability
        );
        assert_eq!(
            filter.predict(&state, 0.1).unwrap_err(),
            Error::NumericalInstability
        );
    }

    #[test]
    fn test_predict_with_zero_dt_preserves_moments() {
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([1.0, 2.0, 4.0, 0.5, 0.2]),
            StateCovariance::from_diagonal(&nalgebra::vector![1.0, 1.0, 2.0, 0.5, 0.2]),
        );

        let (predicted, _) = filter.predict(&state, 0.0).unwrap();

        for i in 0..N_X {
            assert_relative_eq!(
                *predicted.mean.index(i),
                *state.mean.index(i),
                epsilon = 1e-9
            );
        }
        // With dt = 0 the process-noise contribution is itself zero
        for i in 0..N_X {
            for j in 0..N_X {
                assert_relative_eq!(
                    predicted.covariance.as_matrix()[(i, j)],
                    state.covariance.as_matrix()[(i, j)],
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_prediction_grows_uncertainty() {
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([1.0, 2.0, 4.0, 0.5, 0.2]),
            StateCovariance::identity(),
        );

        let (predicted, _) = filter.predict(&state, 0.5).unwrap();

        assert!(predicted.uncertainty() > state.uncertainty());
    }

    #[test]
    fn test_lidar_update_with_exact_measurement_is_fixpoint() {
        let filter = make_filter();
        let predicted = UkfState::new(
            StateVector::from_array([3.0, -1.0, 2.0, 0.3, 0.0]),
            StateCovariance::identity(),
        );

        // Measurement exactly at H * x_pred: zero innovation
        let measurement = Measurement::from_array([3.0, -1.0]);
        let posterior = filter.update_lidar(&predicted, &measurement).unwrap();

        for i in 0..N_X {
            assert_relative_eq!(
                *posterior.mean.index(i),
                *predicted.mean.index(i),
                epsilon = 1e-9
            );
        }
        // The correction still shrinks the covariance
        assert!(posterior.uncertainty() < predicted.uncertainty());
    }

    #[test]
    fn test_lidar_update_moves_toward_measurement() {
        let filter = make_filter();
        let predicted = UkfState::new(
            StateVector::from_array([0.0, 0.0, 0.0, 0.0, 0.0]),
            StateCovariance::identity().scale(100.0),
        );

        let measurement = Measurement::from_array([10.0, 5.0]);
        let posterior = filter.update_lidar(&predicted, &measurement).unwrap();

        // High prior uncertainty and a precise sensor: nearly all the way
        assert!(*posterior.mean.index(0) > 9.9);
        assert!(*posterior.mean.index(1) > 4.9);
    }

    #[test]
    fn test_radar_update_with_consistent_measurement() {
        // Predicted state (1, 1, 2, pi/4, 0) observes exactly
        // (sqrt(2), pi/4, 2); the innovation should be near zero.
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([1.0, 1.0, 2.0, FRAC_PI_4, 0.0]),
            StateCovariance::identity().scale(1e-4),
        );

        let (predicted, points) = filter.predict(&state, 0.0).unwrap();
        let measurement = Measurement::from_array([2.0_f64.sqrt(), FRAC_PI_4, 2.0]);

        let posterior = filter.update_radar(&predicted, &points, &measurement).unwrap();

        for i in 0..N_X {
            assert_relative_eq!(
                *posterior.mean.index(i),
                *predicted.mean.index(i),
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_radar_update_degenerate_geometry_is_reported() {
        // Target sitting on the sensor origin: the central sigma point has
        // zero range, so the measurement mapping must refuse
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([0.0, 0.0, 2.0, 0.0, 0.0]),
            StateCovariance::identity().scale(1e-4),
        );

        let (predicted, points) = filter.predict(&state, 0.0).unwrap();
        let measurement = Measurement::from_array([0.1, 0.0, 0.5]);

        assert_eq!(
            filter
                .update_radar(&predicted, &points, &measurement)
                .unwrap_err(),
            Error::NumericalInstability
        );
    }

    #[test]
    fn test_radar_update_wraps_innovation_bearing() {
        // Target below the -x axis: predicted bearing near -pi. A measurement
        // bearing of +3.1 rad is the same direction within 0.15 rad, but the
        // raw residual is close to 2*pi; without wrapping the update would
        // fling the estimate far away.
        let filter = make_filter();
        let state = UkfState::new(
            StateVector::from_array([-5.0, -0.5, 1.0, 0.0, 0.0]),
            StateCovariance::identity().scale(1e-4),
        );

        let (predicted, points) = filter.predict(&state, 0.0).unwrap();
        let range = (25.0_f64 + 0.25).sqrt();
        let measurement = Measurement::from_array([range, 3.1, -1.0]);

        let posterior = filter.update_radar(&predicted, &points, &measurement).unwrap();

        assert!((*posterior.mean.index(0) - -5.0).abs() < 0.2);
        assert!((*posterior.mean.index(1) - -0.5).abs() < 0.2);
    }
}
