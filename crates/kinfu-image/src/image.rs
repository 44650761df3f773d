use crate::{
    device::{Cpu, DeviceMarker},
    error::ImageError,
    storage::Storage,
};

/// Image size in pixels
///
/// # Examples
///
/// ```
/// use kinfu_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// assert_eq!(image_size.num_pixels(), 200);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Total number of pixels.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// The size after halving both dimensions `levels` times.
    #[inline]
    pub fn downscaled(&self, levels: usize) -> ImageSize {
        ImageSize {
            width: self.width >> levels,
            height: self.height >> levels,
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// A single-channel image stored row-major.
///
/// The pixel type is generic so the same container holds depth maps (`f32`),
/// raw sensor frames (`u16`) and per-pixel 3D points or normals.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T, D: DeviceMarker = Cpu> {
    size: ImageSize,
    storage: Storage<T, D>,
}

impl<T, D: DeviceMarker> Image<T, D> {
    /// Create a new image from pixel data.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use kinfu_image::{Image, ImageSize};
    ///
    /// let image = Image::<u16>::new(
    ///     ImageSize { width: 10, height: 20 },
    ///     vec![0u16; 10 * 20],
    /// ).unwrap();
    ///
    /// assert_eq!(image.width(), 10);
    /// assert_eq!(image.height(), 20);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if data.len() != size.num_pixels() {
            return Err(ImageError::InvalidDataLength(
                data.len(),
                size.num_pixels(),
            ));
        }
        Ok(Self {
            size,
            storage: Storage::from_vec(data),
        })
    }

    /// Create a new image with every pixel set to `val`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be allocated.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        Ok(Self {
            size,
            storage: Storage::from_len_val(size.num_pixels(), val)?,
        })
    }

    /// Create a new image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(size: ImageSize, f: impl Fn(usize, usize) -> T) -> Self {
        let data = (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            size,
            storage: Storage::from_vec(data),
        }
    }

    /// Get the size of the image in pixels.
    #[inline]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the width of the image in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get a reference to the pixel at column `x` and row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.storage.as_slice().get(y * self.size.width + x)
    }

    /// Set the pixel at column `x` and row `y`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel is out of bounds.
    pub fn set(&mut self, x: usize, y: usize, val: T) -> Result<(), ImageError> {
        if x >= self.size.width || y >= self.size.height {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.size.width,
                self.size.height,
            ));
        }
        let width = self.size.width;
        self.storage.as_mut_slice()[y * width + x] = val;
        Ok(())
    }

    /// The pixel data as a row-major slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// The pixel data as a mutable row-major slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Set every pixel to `val`.
    pub fn fill(&mut self, val: T)
    where
        T: Clone,
    {
        self.storage.fill(val);
    }

    /// Apply `f` to every pixel and return the resulting image.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Image<U, D> {
        Image {
            size: self.size,
            storage: Storage::from_vec(self.as_slice().iter().map(f).collect()),
        }
    }

    /// Copy the image to device `D2`.
    pub fn to_device<D2: DeviceMarker>(&self) -> Image<T, D2>
    where
        T: Clone,
    {
        Image {
            size: self.size,
            storage: self.storage.to_device(),
        }
    }
}
