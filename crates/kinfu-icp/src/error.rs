use kinfu_image::ImageSize;

/// An error type for the ICP module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum IcpError {
    /// Error when the model and current pyramids have a different number of levels.
    #[error("Model has {0} levels but current frame has {1}")]
    LevelCountMismatch(usize, usize),

    /// Error when more levels are configured than the pyramids provide.
    #[error("{0} ICP levels configured but the pyramids have {1}")]
    TooManyLevels(usize, usize),

    /// Error when a level of the model and current maps differ in size.
    #[error("Level {0} size mismatch: model {1}, current {2}")]
    SizeMismatch(usize, ImageSize, ImageSize),

    /// Error when a rejection threshold is not usable.
    #[error("Invalid ICP threshold: {0}")]
    InvalidThreshold(String),
}
