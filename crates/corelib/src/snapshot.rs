//! Persisted documents for the registry and the ring.
//!
//! The two snapshots are independent; keeping them consistent is the
//! builder's job, not the store's.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::token::Token;

/// Persisted metadata for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub weight: u64,
    pub partition_count: u32,
}

/// Registry snapshot: device id to device metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrySnapshot {
    pub devices: BTreeMap<DeviceId, DeviceRecord>,
}

/// Ring snapshot: virtual-partition token to owning device id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RingSnapshot {
    pub entries: BTreeMap<Token, DeviceId>,
}

impl RegistrySnapshot {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl RingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
