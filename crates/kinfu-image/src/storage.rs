use std::marker::PhantomData;

use crate::{device::DeviceMarker, error::ImageError};

/// An owned buffer of elements living on the device `D`.
///
/// The storage owns its memory exclusively. Cloning performs a deep copy and
/// [`Storage::to_device`] is the only way to move data between devices.
#[derive(Debug, Clone, PartialEq)]
pub struct Storage<T, D: DeviceMarker> {
    data: Vec<T>,
    _device: PhantomData<D>,
}

impl<T, D: DeviceMarker> Storage<T, D> {
    /// Wrap an existing vector.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data,
            _device: PhantomData,
        }
    }

    /// Allocate `len` elements initialised to `val`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::AllocationFailed`] if the memory cannot be reserved.
    pub fn from_len_val(len: usize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ImageError::AllocationFailed(len))?;
        data.resize(len, val);
        Ok(Self::from_vec(data))
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the storage holds no element.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Set every element to `val`.
    pub fn fill(&mut self, val: T)
    where
        T: Clone,
    {
        self.data.fill(val);
    }

    /// Consume the storage and return the underlying vector.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Copy the elements into a new storage on device `D2`.
    pub fn to_device<D2: DeviceMarker>(&self) -> Storage<T, D2>
    where
        T: Clone,
    {
        Storage::from_vec(self.data.clone())
    }

    /// The device the storage lives on.
    #[inline]
    pub fn device(&self) -> crate::device::Device {
        D::device_info()
    }
}
