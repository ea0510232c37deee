//! End-to-end tracking scenarios driving the full fusion pipeline.

mod common;

use common::{default_fusion, Target};
use fusor::prelude::*;

const STEP_US: i64 = 100_000; // 0.1 s between measurements

#[test]
fn test_lidar_only_tracking_converges() {
    // Straight-line target observed by noise-free lidar only
    let target = Target {
        px: 1.0,
        py: 0.5,
        speed: 2.0,
        heading: 0.0,
    };
    let mut fusion = default_fusion();
    fusion.use_radar = false;

    for k in 0..20 {
        let t = k as f64 * 0.1;
        fusion
            .process_measurement(&target.lidar_at(t, k * STEP_US))
            .unwrap();
    }

    let state = fusion.state().unwrap();
    let (px_true, py_true) = target.at(1.9);

    assert!((state.mean.index(0) - px_true).abs() < 0.2);
    assert!((state.mean.index(1) - py_true).abs() < 0.2);
    // The filter has picked up the motion: positive speed, heading near 0
    assert!(*state.mean.index(2) > 0.5);
    assert!(state.mean.index(3).abs() < 0.5);
    // Uncertainty has shrunk well below the identity prior
    assert!(state.uncertainty() < 5.0);
}

#[test]
fn test_mixed_lidar_radar_tracking() {
    // Alternate sensors the way a real log interleaves them
    let target = Target {
        px: 2.0,
        py: 1.0,
        speed: 3.0,
        heading: 0.3,
    };
    let mut fusion = default_fusion();

    for k in 0..30 {
        let t = k as f64 * 0.1;
        let package = if k % 2 == 0 {
            target.lidar_at(t, k * STEP_US)
        } else {
            target.radar_at(t, k * STEP_US)
        };
        fusion.process_measurement(&package).unwrap();
    }

    let state = fusion.state().unwrap();
    let (px_true, py_true) = target.at(2.9);

    assert!((state.mean.index(0) - px_true).abs() < 0.3);
    assert!((state.mean.index(1) - py_true).abs() < 0.3);
    assert!((state.mean.index(2) - target.speed).abs() < 1.0);
    assert!(state.uncertainty() < 2.0);
}

#[test]
fn test_radar_only_tracking() {
    let target = Target {
        px: 5.0,
        py: 3.0,
        speed: 2.0,
        heading: 0.5,
    };
    let mut fusion = default_fusion();
    fusion.use_lidar = false;

    for k in 0..30 {
        let t = k as f64 * 0.1;
        fusion
            .process_measurement(&target.radar_at(t, k * STEP_US))
            .unwrap();
    }

    let state = fusion.state().unwrap();
    let (px_true, py_true) = target.at(2.9);

    // Radar is noisier in position than lidar, so looser bounds
    assert!((state.mean.index(0) - px_true).abs() < 0.5);
    assert!((state.mean.index(1) - py_true).abs() < 0.5);
    assert!(state.uncertainty() < 5.0);
}

#[test]
fn test_stale_measurement_does_not_derail_tracking() {
    let target = Target {
        px: 1.0,
        py: 1.0,
        speed: 1.0,
        heading: 0.0,
    };
    let mut fusion = default_fusion();

    fusion
        .process_measurement(&target.lidar_at(0.0, 0))
        .unwrap();
    fusion
        .process_measurement(&target.lidar_at(0.1, STEP_US))
        .unwrap();

    // An out-of-order replay is rejected without corrupting the belief
    let before = fusion.state().unwrap().clone();
    let stale = target.lidar_at(0.05, STEP_US / 2);
    assert_eq!(
        fusion.process_measurement(&stale).unwrap_err(),
        fusor::Error::NonMonotonicTimestamp
    );
    assert_eq!(fusion.state().unwrap(), &before);

    // Tracking continues normally afterwards
    fusion
        .process_measurement(&target.lidar_at(0.2, 2 * STEP_US))
        .unwrap();
    let state = fusion.state().unwrap();
    let (px_true, _) = target.at(0.2);
    assert!((state.mean.index(0) - px_true).abs() < 0.2);
}

#[test]
fn test_estimate_sits_between_prior_and_measurement() {
    // Two lidar fixes: the posterior position must be a weighted blend,
    // strictly inside the interval spanned by prior and measurement
    let mut fusion = default_fusion();

    fusion
        .process_measurement(&MeasurementPackage::lidar(1.0, 0.5, 0))
        .unwrap();
    fusion
        .process_measurement(&MeasurementPackage::lidar(1.1, 0.55, STEP_US))
        .unwrap();

    let state = fusion.state().unwrap();
    assert!(*state.mean.index(0) > 1.0 && *state.mean.index(0) < 1.1);
    assert!(*state.mean.index(1) > 0.5 && *state.mean.index(1) < 0.55);
    assert!(state.uncertainty() < 5.0);
}
