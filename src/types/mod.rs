//! Core types for type-safe vector spaces, transformations, and angles

pub mod angles;
pub mod spaces;
pub mod transforms;
