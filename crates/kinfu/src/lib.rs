#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Serializable pipeline configuration.
pub mod config;

/// Error types for the pipeline.
pub mod error;

/// The per-frame fusion and tracking loop.
pub mod pipeline;

pub use crate::config::{CameraConfig, DepthConfig, FusionConfig, IcpConfig, VolumeConfig};
pub use crate::error::FusionError;
pub use crate::pipeline::{FrameStatus, KinectFusion};

#[doc(inline)]
pub use kinfu_3d as k3d;

#[doc(inline)]
pub use kinfu_icp as icp;

#[doc(inline)]
pub use kinfu_image as image;

#[doc(inline)]
pub use kinfu_imgproc as imgproc;

#[doc(inline)]
pub use kinfu_lie as lie;
