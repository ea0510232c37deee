//! Fusor: lidar/radar sensor fusion with an Unscented Kalman Filter
//!
//! A type-safe implementation of single-target 2-D tracking over the
//! constant-turn-rate-and-velocity (CTRV) motion model. Lidar measurements
//! are incorporated with a standard linear Kalman correction; radar
//! measurements (range, bearing, range-rate) with an unscented correction.
//!
//! # Features
//!
//! - **Type Safety**: state, measurement, and innovation spaces encoded in
//!   the type system so vectors from different spaces cannot be mixed
//! - **Explicit failure signalling**: Cholesky breakdown and degenerate
//!   sensor geometry surface as errors instead of propagating NaNs
//! - **no_std Support**: works in embedded environments

#![cfg_attr(not(feature = "std"), no_std)]

pub mod types;
pub mod models;
pub mod filters;

pub mod prelude {
    pub use crate::types::spaces::*;
    pub use crate::types::transforms::*;
    pub use crate::types::angles::*;
    pub use crate::models::*;
    pub use crate::filters::ukf::*;
    pub use crate::filters::fusion::*;
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Numerical computation became unstable (Cholesky factorization of the
    /// augmented covariance failed, or the radar geometry is degenerate)
    NumericalInstability,
    /// Innovation covariance is singular and cannot be inverted
    SingularInnovation,
    /// Measurement timestamp is not strictly greater than the previous one
    NonMonotonicTimestamp,
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl ::core::fmt::Display for Error {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            Error::NumericalInstability => write!(f, "Numerical instability detected"),
            Error::SingularInnovation => write!(f, "Innovation covariance is singular"),
            Error::NonMonotonicTimestamp => {
                write!(f, "Measurement timestamp is not strictly increasing")
            }
        }
    }
}

pub type Result<T> = ::core::result::Result<T, Error>;
