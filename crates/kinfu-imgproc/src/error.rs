use kinfu_image::{ImageError, ImageSize};

/// An error type for depth processing.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DepthError {
    /// Error from the image containers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error when the depth scale is not a positive finite number.
    #[error("Invalid depth scale {0}")]
    InvalidScale(f32),

    /// Error when the valid depth range is empty or not finite.
    #[error("Invalid depth range [{0}, {1}]")]
    InvalidRange(f32, f32),

    /// Error when source and destination images differ in size.
    #[error("Image size mismatch: expected {0}, got {1}")]
    SizeMismatch(ImageSize, ImageSize),

    /// Error when a pyramid with zero levels is requested.
    #[error("A depth pyramid needs at least one level")]
    ZeroLevels,

    /// Error when a pyramid level would have no pixels.
    #[error("Pyramid level {0} of an image of size {1} is empty")]
    LevelTooSmall(usize, ImageSize),
}
