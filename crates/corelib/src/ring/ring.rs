//! Hash ring data structure.
//!
//! Holds `BTreeMap<Token, DeviceId>`: the map's key order is the ascending
//! sorted-key sequence used for successor lookup, maintained incrementally
//! on every insert and delete.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use tracing::{debug, error};

use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::snapshot::RingSnapshot;
use crate::token::Token;
use crate::vnode::VirtualPartition;

/// Ordered ring of virtual-partition tokens and their owning devices.
///
/// Knows nothing about devices beyond their ids.
#[derive(Debug, Clone)]
pub struct HashRing<P: Partitioner = Md5Partitioner> {
    entries: BTreeMap<Token, DeviceId>,
    partitioner: P,
}

impl HashRing<Md5Partitioner> {
    /// Empty ring using the default MD5 partitioner.
    pub fn new() -> Self {
        Self::with_partitioner(Md5Partitioner)
    }
}

impl Default for HashRing<Md5Partitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> HashRing<P> {
    pub fn with_partitioner(partitioner: P) -> Self {
        Self {
            entries: BTreeMap::new(),
            partitioner,
        }
    }

    /// Rebuild a ring from its snapshot.
    ///
    /// Entries are taken as-is; checking them against a registry is
    /// [`HashRing::verify`]'s job.
    pub fn from_snapshot(snapshot: &RingSnapshot, partitioner: P) -> Self {
        Self {
            entries: snapshot.entries.clone(),
            partitioner,
        }
    }

    pub fn snapshot(&self) -> RingSnapshot {
        RingSnapshot {
            entries: self.entries.clone(),
        }
    }

    fn vparts(&self, device_id: DeviceId, indices: Range<u32>) -> impl Iterator<Item = VirtualPartition> + '_ {
        indices.map(move |i| VirtualPartition::from_index(&self.partitioner, device_id, i))
    }

    /// Place partitions `indices` of `device_id` on the ring.
    ///
    /// All-or-nothing: a token that is already present (or repeated within
    /// the batch) fails the whole call with [`Error::Integrity`] and leaves
    /// the ring untouched.
    pub fn insert_partitions(&mut self, device_id: DeviceId, indices: Range<u32>) -> Result<()> {
        let mut staged = BTreeSet::new();
        for vpart in self.vparts(device_id, indices.clone()) {
            if let Some(owner) = self.entries.get(&vpart.token) {
                error!(%device_id, index = vpart.index, token = %vpart.token, %owner, "digest collision on insert");
                return Err(Error::integrity(format!(
                    "token {} for device {} partition {} already owned by device {}",
                    vpart.token, device_id, vpart.index, owner
                )));
            }
            if !staged.insert(vpart.token) {
                error!(%device_id, index = vpart.index, token = %vpart.token, "digest collision within batch");
                return Err(Error::integrity(format!(
                    "token {} for device {} partition {} collides with another partition of the same device",
                    vpart.token, device_id, vpart.index
                )));
            }
        }

        for token in staged {
            self.entries.insert(token, device_id);
        }
        debug!(%device_id, start = indices.start, end = indices.end, "inserted partitions");
        Ok(())
    }

    /// Remove partitions `indices` of `device_id` from the ring.
    ///
    /// All-or-nothing: a token that is missing or owned by another device
    /// fails the whole call with [`Error::Integrity`].
    pub fn remove_partitions(&mut self, device_id: DeviceId, indices: Range<u32>) -> Result<()> {
        let mut staged = Vec::with_capacity(indices.len());
        for vpart in self.vparts(device_id, indices.clone()) {
            match self.entries.get(&vpart.token) {
                Some(owner) if *owner == device_id => staged.push(vpart.token),
                Some(owner) => {
                    error!(%device_id, index = vpart.index, token = %vpart.token, %owner, "partition owned by another device");
                    return Err(Error::integrity(format!(
                        "token {} for device {} partition {} is owned by device {}",
                        vpart.token, device_id, vpart.index, owner
                    )));
                }
                None => {
                    error!(%device_id, index = vpart.index, token = %vpart.token, "partition missing from ring");
                    return Err(Error::integrity(format!(
                        "token {} for device {} partition {} is missing from the ring",
                        vpart.token, device_id, vpart.index
                    )));
                }
            }
        }

        for token in staged {
            self.entries.remove(&token);
        }
        debug!(%device_id, start = indices.start, end = indices.end, "removed partitions");
        Ok(())
    }

    /// Resolve a raw key to its owning device.
    ///
    /// Returns `None` only when the ring is empty.
    pub fn lookup(&self, key: &[u8]) -> Option<DeviceId> {
        self.successor(&self.partitioner.partition(key))
    }

    /// Owner of the smallest token `>= token`, wrapping to the smallest token.
    pub fn successor(&self, token: &Token) -> Option<DeviceId> {
        self.entries
            .range(token..)
            .next()
            .or_else(|| self.entries.iter().next())
            .map(|(_, device_id)| *device_id)
    }

    /// Check that the ring holds exactly the partitions implied by `expected`
    /// `(device_id, partition_count)` pairs, and nothing else.
    pub fn verify<I>(&self, expected: I) -> Result<()>
    where
        I: IntoIterator<Item = (DeviceId, u32)>,
    {
        let mut total = 0usize;
        for (device_id, count) in expected {
            for vpart in self.vparts(device_id, 0..count) {
                match self.entries.get(&vpart.token) {
                    Some(owner) if *owner == device_id => {}
                    other => {
                        return Err(Error::integrity(format!(
                            "device {} partition {} expected at token {}, found {:?}",
                            device_id, vpart.index, vpart.token, other
                        )));
                    }
                }
            }
            total += count as usize;
        }
        if total != self.entries.len() {
            return Err(Error::integrity(format!(
                "ring holds {} entries but the registry accounts for {}",
                self.entries.len(),
                total
            )));
        }
        Ok(())
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.entries.contains_key(token)
    }

    /// Number of ring entries owned by each device.
    pub fn ownership(&self) -> BTreeMap<DeviceId, usize> {
        let mut counts = BTreeMap::new();
        for device_id in self.entries.values() {
            *counts.entry(*device_id).or_insert(0) += 1;
        }
        counts
    }

    /// All `(token, device)` entries in ascending token order.
    pub fn tokens(&self) -> Vec<(Token, DeviceId)> {
        self.entries.iter().map(|(t, d)| (*t, *d)).collect()
    }

    /// Tokens owned by one device, ascending.
    pub fn tokens_for(&self, device_id: DeviceId) -> Vec<Token> {
        self.entries
            .iter()
            .filter(|(_, owner)| **owner == device_id)
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn token_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }
}
