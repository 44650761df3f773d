#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Conversion of sensor-native depth to metres and depth validity.
pub mod depth;

/// Error types for the depth processing module.
pub mod error;

/// Utilities for parallel row processing.
pub mod parallel;

/// Depth pyramid construction.
pub mod pyramid;

pub use crate::depth::{depth_from_raw, is_valid_depth};
pub use crate::error::DepthError;
pub use crate::pyramid::{build_depth_pyramid, pyrdown_depth};
