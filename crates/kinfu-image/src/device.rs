//! Device markers for compile-time placement of container memory.
//!
//! Every container is tagged with a zero-sized [`DeviceMarker`]. Moving data
//! between locations is always an explicit copy (`to_device`), so a host and a
//! device container never alias the same buffer.

/// Device type enumeration, used for queries and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Host memory.
    #[default]
    Cpu,
}

impl Device {
    /// Returns the device type as a string.
    pub fn device_type(&self) -> &str {
        match self {
            Device::Cpu => "cpu",
        }
    }

    /// Returns true if the device is the host.
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.device_type())
    }
}

/// Marker trait for device types.
///
/// The trait is sealed: only the built-in device types implement it.
pub trait DeviceMarker: private::Sealed + Clone + Copy + Default + Send + Sync + 'static {
    /// Returns the device this marker stands for.
    fn device_info() -> Device;
}

mod private {
    pub trait Sealed {}

    impl Sealed for super::Cpu {}
}

/// Zero-sized type representing host memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cpu;

impl DeviceMarker for Cpu {
    fn device_info() -> Device {
        Device::Cpu
    }
}
