/// An error type for the image containers.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the container size.
    #[error("Data length ({0}) does not match the container size ({1})")]
    InvalidDataLength(usize, usize),

    /// Error when the requested size is zero along some dimension.
    #[error("Invalid empty size {0}")]
    EmptySize(String),

    /// Error when the buffer could not be allocated.
    #[error("Failed to allocate {0} elements")]
    AllocationFailed(usize),

    /// Error when a pixel index is out of bounds.
    #[error("Pixel index ({0}, {1}) out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the number of cells does not fit in memory addresses.
    #[error("The cell count of {0} overflows")]
    SizeOverflow(String),

    /// Error when a pyramid is built without levels.
    #[error("A pyramid needs at least one level")]
    EmptyPyramid,
}
