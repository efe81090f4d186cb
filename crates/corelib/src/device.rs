//! Device abstractions for the ring builder.
//!
//! Devices are the physical participants that own virtual partitions. They
//! are identified by a compact `DeviceId` that is cheap to compare and hash.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Compact identifier for a registered device.
///
/// Always positive; `0` is rejected by [`DeviceId::new`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// Validate and wrap a raw id.
    pub fn new(raw: u64) -> Result<Self> {
        if raw == 0 {
            return Err(Error::invalid("id must be a positive integer"));
        }
        Ok(DeviceId(raw))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A device registered with the ring builder.
///
/// `partition_count` is always derived from `weight`; the registry is the only
/// place that writes either field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    /// Human‑readable name or hostname.
    pub name: String,
    /// Relative capacity, a positive multiple of the configured weight step.
    pub weight: u64,
    /// Number of virtual partitions the device owns on the ring.
    pub partition_count: u32,
}

impl Device {
    pub(crate) fn new(id: DeviceId, name: impl Into<String>, weight: u64, partition_count: u32) -> Self {
        Self {
            id,
            name: name.into(),
            weight,
            partition_count,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device(id={}, name={}, weight={}, partitions={})",
            self.id, self.name, self.weight, self.partition_count
        )
    }
}
