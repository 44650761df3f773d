#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera model.
pub mod camera;

/// Error types for the 3d module.
pub mod error;

/// Fusion of depth frames into the TSDF volume.
pub mod integrate;

/// Per-pixel point and normal maps.
pub mod pointcloud;

/// Synthetic depth rendering by raymarching the TSDF volume.
pub mod raycast;

/// Analytic scenes rendered to exact depth maps.
pub mod synthetic;

/// Truncated signed distance volume.
pub mod tsdf;

pub use crate::camera::PinholeCamera;
pub use crate::error::TsdfError;
pub use crate::integrate::{integrate, IntegrationParams};
pub use crate::pointcloud::{
    depth_to_points, is_valid_point, points_to_normals, PointNormalMap, PointNormalPyramid,
};
pub use crate::raycast::{raycast, raycast_depth};
pub use crate::tsdf::{TsdfVolume, Voxel};
