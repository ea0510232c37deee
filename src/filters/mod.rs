//! Filtering layers
//!
//! - [`ukf::UnscentedCtrvFilter`]: the unscented prediction/correction core
//! - [`fusion::SensorFusion`]: the stateful front end that consumes timestamped
//!   lidar/radar measurements one at a time

pub mod fusion;
pub mod ukf;
