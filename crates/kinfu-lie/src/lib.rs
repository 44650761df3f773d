#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Lie groups for tracking
//!
//! Rotations and rigid body transformations used by the fusion pipeline to
//! represent the sensor pose and to apply incremental Gauss-Newton updates.
//!
//! - **SO(3)**: 3D rotations, stored as a unit quaternion.
//! - **SE(3)**: 3D rigid body transformations (rotation + translation).
//!
//! Tangent vectors of SE(3) ("twists") are ordered `[ω; v]`: rotation first,
//! translation second.
//!
//! ## Example
//!
//! ```rust
//! use kinfu_lie::{SE3F32, Twist};
//! use glam::Vec3;
//!
//! let twist: Twist = [0.0, 0.0, 0.1, 0.01, 0.0, 0.0];
//! let pose = SE3F32::exp(&twist);
//! let p = pose * Vec3::new(1.0, 0.0, 0.0);
//! assert!((pose.inverse() * p - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
//! ```

/// Special Euclidean group SE(3) for 3D rigid transformations.
pub mod se3;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;

pub use se3::{Twist, SE3F32};
pub use so3::SO3F32;
