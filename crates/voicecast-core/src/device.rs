//! Output device descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of the output device list, as captured by the last refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Position in the enumeration; what callers pass to select a device.
    pub index: usize,
    /// Human readable device name.
    pub name: String,
    /// Stable identifier (`host:name`) used to reopen the device.
    pub id: String,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.name)
    }
}
