//! Motion and sensor models
//!
//! The CTRV transition model describes how the tracked object moves; the
//! lidar and radar models describe how each sensor observes it.

mod observation;
mod transition;

pub use observation::*;
pub use transition::*;

/// Shared near-zero tolerance for the two guarded divisions in the crate:
/// the yaw-rate division in the CTRV propagation and the range division in
/// the radar measurement function.
pub(crate) const NEAR_ZERO_TOLERANCE: f64 = 1e-3;
