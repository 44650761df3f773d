use crate::{
    device::{Cpu, DeviceMarker},
    error::ImageError,
    storage::Storage,
};

/// Size of a dense 3D grid in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VolumeSize {
    /// Number of cells along x.
    pub width: usize,
    /// Number of cells along y.
    pub height: usize,
    /// Number of cells along z.
    pub depth: usize,
}

impl VolumeSize {
    /// Total number of cells, or `None` if it does not fit in `usize`.
    #[inline]
    pub fn checked_num_cells(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.depth)
    }

    /// Total number of cells, saturating at `usize::MAX`.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.checked_num_cells().unwrap_or(usize::MAX)
    }

    /// Number of cells in one z-plane, saturating at `usize::MAX`.
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Whether `(x, y, z)` lies inside the grid.
    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.width && y < self.height && z < self.depth
    }

    /// Linear index of cell `(x, y, z)`: `x + width * (y + height * z)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.width * (y + self.height * z)
    }
}

impl std::fmt::Display for VolumeSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "VolumeSize {{ width: {}, height: {}, depth: {} }}",
            self.width, self.height, self.depth
        )
    }
}

impl From<[usize; 3]> for VolumeSize {
    fn from(size: [usize; 3]) -> Self {
        VolumeSize {
            width: size[0],
            height: size[1],
            depth: size[2],
        }
    }
}

/// A dense 3D grid with x varying fastest, then y, then z.
///
/// Each z-plane is a contiguous `width * height` block, which lets callers hand
/// disjoint planes to different threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T, D: DeviceMarker = Cpu> {
    size: VolumeSize,
    storage: Storage<T, D>,
}

impl<T, D: DeviceMarker> Volume<T, D> {
    /// Create a new volume from cell data.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell count overflows or if the data length does
    /// not match the volume size.
    pub fn new(size: VolumeSize, data: Vec<T>) -> Result<Self, ImageError> {
        let num_cells = size
            .checked_num_cells()
            .ok_or_else(|| ImageError::SizeOverflow(size.to_string()))?;
        if data.len() != num_cells {
            return Err(ImageError::InvalidDataLength(data.len(), num_cells));
        }
        Ok(Self {
            size,
            storage: Storage::from_vec(data),
        })
    }

    /// Create a new volume with every cell set to `val`.
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is zero, if the cell count overflows
    /// or if the buffer cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use kinfu_image::{Volume, VolumeSize};
    ///
    /// let volume = Volume::<f32>::from_size_val([4, 3, 2].into(), 0.0).unwrap();
    /// assert_eq!(volume.size().num_cells(), 24);
    /// assert!(Volume::<f32>::from_size_val([4, 0, 2].into(), 0.0).is_err());
    /// ```
    pub fn from_size_val(size: VolumeSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let num_cells = size
            .checked_num_cells()
            .ok_or_else(|| ImageError::SizeOverflow(size.to_string()))?;
        if num_cells == 0 {
            return Err(ImageError::EmptySize(size.to_string()));
        }
        Ok(Self {
            size,
            storage: Storage::from_len_val(num_cells, val)?,
        })
    }

    /// Get the size of the volume.
    #[inline]
    pub fn size(&self) -> VolumeSize {
        self.size
    }

    /// Get a reference to the cell `(x, y, z)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        if !self.size.contains(x, y, z) {
            return None;
        }
        self.storage.as_slice().get(self.size.index(x, y, z))
    }

    /// Get a mutable reference to the cell `(x, y, z)`.
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> Option<&mut T> {
        if !self.size.contains(x, y, z) {
            return None;
        }
        let idx = self.size.index(x, y, z);
        self.storage.as_mut_slice().get_mut(idx)
    }

    /// The z-plane `z` as a row-major slice, or `None` if out of range.
    pub fn plane(&self, z: usize) -> Option<&[T]> {
        if z >= self.size.depth {
            return None;
        }
        let len = self.size.plane_len();
        Some(&self.storage.as_slice()[z * len..(z + 1) * len])
    }

    /// The z-plane `z` as a mutable row-major slice, or `None` if out of range.
    pub fn plane_mut(&mut self, z: usize) -> Option<&mut [T]> {
        if z >= self.size.depth {
            return None;
        }
        let len = self.size.plane_len();
        Some(&mut self.storage.as_mut_slice()[z * len..(z + 1) * len])
    }

    /// All cells as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// All cells as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Set every cell to `val`.
    pub fn fill(&mut self, val: T)
    where
        T: Clone,
    {
        self.storage.fill(val);
    }

    /// Copy the volume to device `D2`.
    pub fn to_device<D2: DeviceMarker>(&self) -> Volume<T, D2>
    where
        T: Clone,
    {
        Volume {
            size: self.size,
            storage: self.storage.to_device(),
        }
    }
}
