#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Device markers describing where a container's memory lives.
pub mod device;

/// Error types for the image module.
pub mod error;

/// 2D image representation.
pub mod image;

/// Multi-resolution image stacks.
pub mod pyramid;

/// Owned, device-tagged element buffers.
pub mod storage;

/// Dense 3D grids.
pub mod volume;

pub use crate::device::{Cpu, Device, DeviceMarker};
pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
pub use crate::pyramid::Pyramid;
pub use crate::storage::Storage;
pub use crate::volume::{Volume, VolumeSize};
