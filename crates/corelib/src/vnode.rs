//! Virtual partition abstractions.
//!
//! # Virtual Partitions
//!
//! Each device owns `partition_count` positions on the ring, one per index in
//! `[0, partition_count)`. The position of index `i` for device `d` is the
//! digest of the label `device_<d>_p<i>`, so it can be regenerated from
//! `(device_id, index)` alone and never needs to be stored next to the device.
//!
//! Growing a device appends indices at the top of its range and shrinking
//! drops them from the top, so a weight change never moves the positions
//! the device keeps.

use std::fmt;

use crate::device::DeviceId;
use crate::partitioner::Partitioner;
use crate::token::Token;

/// Label hashed to place partition `index` of device `device_id`.
pub fn partition_label(device_id: DeviceId, index: u32) -> String {
    format!("device_{}_p{}", device_id, index)
}

/// A virtual partition on the hash ring.
///
/// # Invariants
///
/// - Every `VirtualPartition` in a ring has a unique token
/// - `token == partitioner.partition(partition_label(device_id, index))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualPartition {
    /// Token position on the ring.
    pub token: Token,
    /// The device that owns this partition.
    pub device_id: DeviceId,
    /// Index within the owning device's `[0, partition_count)` range.
    pub index: u32,
}

impl VirtualPartition {
    /// Derive the virtual partition for `index` of `device_id`.
    pub fn from_index<P: Partitioner + ?Sized>(partitioner: &P, device_id: DeviceId, index: u32) -> Self {
        let label = partition_label(device_id, index);
        Self {
            token: partitioner.partition(label.as_bytes()),
            device_id,
            index,
        }
    }
}

impl fmt::Display for VirtualPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VPart(token={}, device={}, index={})",
            self.token, self.device_id, self.index
        )
    }
}
