use crate::{
    device::{Cpu, DeviceMarker},
    error::ImageError,
    image::Image,
};

/// A multi-resolution stack of images, finest level first.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid<T, D: DeviceMarker = Cpu> {
    levels: Vec<Image<T, D>>,
}

impl<T, D: DeviceMarker> Pyramid<T, D> {
    /// Create a pyramid from its levels, finest first.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::EmptyPyramid`] if `levels` is empty.
    pub fn new(levels: Vec<Image<T, D>>) -> Result<Self, ImageError> {
        if levels.is_empty() {
            return Err(ImageError::EmptyPyramid);
        }
        Ok(Self { levels })
    }

    /// Number of levels.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// The image at `level`, where level 0 is the finest.
    #[inline]
    pub fn level(&self, level: usize) -> Option<&Image<T, D>> {
        self.levels.get(level)
    }

    /// The finest level.
    #[inline]
    pub fn finest(&self) -> &Image<T, D> {
        &self.levels[0]
    }

    /// Iterate over the levels from finest to coarsest.
    pub fn iter(&self) -> std::slice::Iter<'_, Image<T, D>> {
        self.levels.iter()
    }

    /// Consume the pyramid and return its levels.
    pub fn into_levels(self) -> Vec<Image<T, D>> {
        self.levels
    }
}
