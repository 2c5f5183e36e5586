//! Device inventory lookup port.
//!
//! The runner resolves device names to management addresses and OS types
//! through this trait; the default implementation is backed by the static
//! `devices` section of the configuration.

use std::collections::HashMap;

use crate::config::DeviceEntry;
use crate::device::os::DeviceOs;

/// Resolved inventory record for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    /// Management address, if the inventory knows one. Devices without an
    /// address are visible in listings but cannot be reached.
    pub management_ip: Option<String>,
    pub os: DeviceOs,
    pub state: String,
}

/// Resolves device names against an inventory.
pub trait DeviceLookup: Send + Sync {
    fn find(&self, name: &str) -> Option<DeviceRecord>;

    /// All known device names, sorted for stable display.
    fn names(&self) -> Vec<String>;
}

/// Inventory backed by the `devices` map from configuration.
pub struct StaticDeviceLookup {
    devices: HashMap<String, DeviceEntry>,
}

impl StaticDeviceLookup {
    #[must_use]
    pub fn new(devices: HashMap<String, DeviceEntry>) -> Self {
        Self { devices }
    }
}

impl DeviceLookup for StaticDeviceLookup {
    fn find(&self, name: &str) -> Option<DeviceRecord> {
        self.devices.get(name).map(|entry| DeviceRecord {
            name: name.to_string(),
            management_ip: entry.management_ip.clone(),
            os: DeviceOs::normalize(&entry.os_type),
            state: entry.state.clone(),
        })
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
