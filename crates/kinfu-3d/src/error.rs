use kinfu_image::{ImageError, ImageSize};
use kinfu_imgproc::DepthError;

/// An error type for camera geometry and volume fusion.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TsdfError {
    /// Error from the image containers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the depth processing.
    #[error(transparent)]
    Depth(#[from] DepthError),

    /// Error when an image does not match the camera resolution.
    #[error("Image size mismatch: expected {0}, got {1}")]
    SizeMismatch(ImageSize, ImageSize),

    /// Error when the grid has fewer than two voxels along an axis.
    #[error("The grid needs at least 2 voxels per axis, got {0}x{1}x{2}")]
    GridTooSmall(usize, usize, usize),

    /// Error when the voxel spacing is not positive and finite.
    #[error("Invalid voxel size ({0}, {1}, {2})")]
    InvalidVoxelSize(f32, f32, f32),

    /// Error when the truncation distance is not positive and finite.
    #[error("Invalid truncation distance {0}")]
    InvalidTruncation(f32),

    /// Error when the observation weight or its cap is invalid.
    #[error("Invalid integration weight {0} with maximum {1}")]
    InvalidWeight(f32, f32),

    /// Error when the camera intrinsics are not usable.
    #[error("Invalid camera intrinsics: {0}")]
    InvalidCamera(String),
}
