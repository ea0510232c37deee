//! Measurement fusion front end
//!
//! [`SensorFusion`] owns the filter belief and the measurement clock. It is
//! fed one timestamped [`MeasurementPackage`] at a time and runs the
//! initialize / predict / correct cycle, so callers never deal with sigma
//! points or per-sensor update paths directly.

use nalgebra::RealField;
use num_traits::Float;

use crate::filters::ukf::{UkfState, UnscentedCtrvFilter};
use crate::models::{CtrvModel, LidarSensor, RadarSensor};
use crate::types::spaces::{Measurement, StateVector};
use crate::{Error, Result};

/// Timestamps arrive in microseconds; the motion model integrates in seconds.
const MICROS_PER_SECOND: f64 = 1_000_000.0;

// ============================================================================
// Measurement Packages
// ============================================================================

/// One raw sensor reading.
#[derive(Debug, Clone)]
pub enum SensorReading<T: nalgebra::Scalar> {
    /// Lidar: `[px, py]` in Cartesian coordinates (m)
    Lidar(Measurement<T, 2>),
    /// Radar: `[range (m), bearing (rad), range_rate (m/s)]` in polar
    /// coordinates
    Radar(Measurement<T, 3>),
}

/// A timestamped sensor reading, the unit of input to [`SensorFusion`].
#[derive(Debug, Clone)]
pub struct MeasurementPackage<T: nalgebra::Scalar> {
    /// The sensor reading
    pub reading: SensorReading<T>,
    /// Acquisition time in microseconds
    pub timestamp_us: i64,
}

impl<T: nalgebra::Scalar> MeasurementPackage<T> {
    /// Creates a lidar package from raw position components.
    pub fn lidar(px: T, py: T, timestamp_us: i64) -> Self {
        Self {
            reading: SensorReading::Lidar(Measurement::from_array([px, py])),
            timestamp_us,
        }
    }

    /// Creates a radar package from raw polar components.
    pub fn radar(range: T, bearing: T, range_rate: T, timestamp_us: i64) -> Self {
        Self {
            reading: SensorReading::Radar(Measurement::from_array([range, bearing, range_rate])),
            timestamp_us,
        }
    }
}

// ============================================================================
// Sensor Fusion
// ============================================================================

/// Stateful fusion of lidar and radar measurements into one track estimate.
///
/// The first measurement of either sensor initializes the belief (radar
/// readings are converted from polar to Cartesian position); every later
/// measurement triggers a predict-then-correct cycle. Either sensor can be
/// switched off with [`use_lidar`](Self::use_lidar) /
/// [`use_radar`](Self::use_radar); readings from a disabled sensor are
/// dropped without touching the belief or the clock, except that the very
/// first measurement always initializes.
#[derive(Debug, Clone)]
pub struct SensorFusion<T: RealField> {
    filter: UnscentedCtrvFilter<T>,
    estimate: Option<UkfState<T>>,
    previous_timestamp_us: i64,
    /// Consume lidar measurements
    pub use_lidar: bool,
    /// Consume radar measurements
    pub use_radar: bool,
}

impl<T: RealField + Float + Copy> SensorFusion<T> {
    /// Creates a fusion pipeline from its three models, with both sensors
    /// enabled.
    pub fn new(motion: CtrvModel<T>, lidar: LidarSensor<T>, radar: RadarSensor<T>) -> Self {
        Self {
            filter: UnscentedCtrvFilter::new(motion, lidar, radar),
            estimate: None,
            previous_timestamp_us: 0,
            use_lidar: true,
            use_radar: true,
        }
    }

    /// Returns the current belief, or `None` before the first measurement.
    #[inline]
    pub fn state(&self) -> Option<&UkfState<T>> {
        self.estimate.as_ref()
    }

    /// Returns the underlying filter.
    #[inline]
    pub fn filter(&self) -> &UnscentedCtrvFilter<T> {
        &self.filter
    }

    /// Consumes one timestamped measurement.
    ///
    /// - First measurement ever: initializes the belief from it (even if its
    ///   sensor is disabled) and records the timestamp. No filtering happens.
    /// - Disabled sensor: the package is dropped, belief and clock untouched.
    /// - Otherwise: predict over the elapsed time, then correct with the
    ///   sensor's update path.
    ///
    /// # Errors
    /// - [`Error::NonMonotonicTimestamp`] if the package does not advance the
    ///   clock; belief and clock are untouched.
    /// - [`Error::NumericalInstability`] from sigma point generation; belief
    ///   and clock are untouched.
    /// - [`Error::NumericalInstability`] or [`Error::SingularInnovation`]
    ///   from the correction step; the predicted belief is kept and the clock
    ///   advances, so the track coasts past the bad measurement.
    pub fn process_measurement(&mut self, package: &MeasurementPackage<T>) -> Result<()> {
        let Some(current) = self.estimate.clone() else {
            self.estimate = Some(Self::initial_state(&package.reading));
            self.previous_timestamp_us = package.timestamp_us;
            return Ok(());
        };

        match package.reading {
            SensorReading::Lidar(_) if !self.use_lidar => return Ok(()),
            SensorReading::Radar(_) if !self.use_radar => return Ok(()),
            _ => {}
        }

        let elapsed_us = package.timestamp_us - self.previous_timestamp_us;
        if elapsed_us <= 0 {
            return Err(Error::NonMonotonicTimestamp);
        }
        let dt = T::from_f64(elapsed_us as f64 / MICROS_PER_SECOND).unwrap();

        let (predicted, predicted_points) = self.filter.predict(&current, dt)?;

        let corrected = match &package.reading {
            SensorReading::Lidar(z) => self.filter.update_lidar(&predicted, z),
            SensorReading::Radar(z) => self.filter.update_radar(&predicted, &predicted_points, z),
        };

        self.previous_timestamp_us = package.timestamp_us;
        match corrected {
            Ok(posterior) => {
                self.estimate = Some(posterior);
                Ok(())
            }
            Err(err) => {
                // Correction failed: keep the prediction so the track coasts
                self.estimate = Some(predicted);
                Err(err)
            }
        }
    }

    /// Builds the initial belief from the first measurement.
    ///
    /// Lidar gives position directly; radar position is recovered from range
    /// and bearing. Speed, heading, and heading rate start at zero, and the
    /// covariance starts at identity.
    fn initial_state(reading: &SensorReading<T>) -> UkfState<T> {
        let zero = T::zero();
        let mean = match reading {
            SensorReading::Lidar(z) => {
                StateVector::from_array([*z.index(0), *z.index(1), zero, zero, zero])
            }
            SensorReading::Radar(z) => {
                let range = *z.index(0);
                let bearing = *z.index(1);
                StateVector::from_array([
                    range * Float::cos(bearing),
                    range * Float::sin(bearing),
                    zero,
                    zero,
                    zero,
                ])
            }
        };
        UkfState::with_identity_covariance(mean)
    }
}

impl<T: RealField + Float + Copy> Default for SensorFusion<T> {
    /// Fusion pipeline with the highway-vehicle tuning: σ_a = 3.8 m/s²,
    /// σ_yawdd = 0.3 rad/s², lidar σ = 0.15 m per axis, radar
    /// σ = (0.3 m, 0.03 rad, 0.3 m/s).
    fn default() -> Self {
        Self::new(
            CtrvModel::new(
                T::from_f64(3.8).unwrap(),
                T::from_f64(0.3).unwrap(),
            ),
            LidarSensor::new(T::from_f64(0.15).unwrap(), T::from_f64(0.15).unwrap()),
            RadarSensor::new(
                T::from_f64(0.3).unwrap(),
                T::from_f64(0.03).unwrap(),
                T::from_f64(0.3).unwrap(),
            ),
        )
    }
}
