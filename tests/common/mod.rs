//! Shared helpers for integration tests

use fusor::prelude::*;

/// Fusion pipeline with the default highway-vehicle tuning.
pub fn default_fusion() -> SensorFusion<f64> {
    SensorFusion::default()
}

/// Ground-truth state of a simulated target.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub px: f64,
    pub py: f64,
    pub speed: f64,
    pub heading: f64,
}

impl Target {
    /// Position after moving in a straight line for `t` seconds.
    pub fn at(&self, t: f64) -> (f64, f64) {
        (
            self.px + self.speed * t * self.heading.cos(),
            self.py + self.speed * t * self.heading.sin(),
        )
    }

    /// Noise-free lidar package for the target position at `t` seconds.
    pub fn lidar_at(&self, t: f64, timestamp_us: i64) -> MeasurementPackage<f64> {
        let (px, py) = self.at(t);
        MeasurementPackage::lidar(px, py, timestamp_us)
    }

    /// Noise-free radar package for the target position at `t` seconds.
    pub fn radar_at(&self, t: f64, timestamp_us: i64) -> MeasurementPackage<f64> {
        let (px, py) = self.at(t);
        let range = px.hypot(py);
        let bearing = py.atan2(px);
        let range_rate =
            (px * self.speed * self.heading.cos() + py * self.speed * self.heading.sin()) / range;
        MeasurementPackage::radar(range, bearing, range_rate, timestamp_us)
    }
}
