//! Device registry.
//!
//! The authoritative mapping from device id to device metadata. Every
//! validation rule on ids, names, and weights lives here; the registry knows
//! nothing about the ring.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::BuilderConfig;
use crate::device::{Device, DeviceId};
use crate::error::{Error, Result};
use crate::snapshot::{DeviceRecord, RegistrySnapshot};

/// Registered devices, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Device>,
    config: BuilderConfig,
}

impl DeviceRegistry {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            devices: BTreeMap::new(),
            config,
        }
    }

    /// Rebuild a registry from its snapshot, re-validating every record.
    pub fn from_snapshot(snapshot: &RegistrySnapshot, config: BuilderConfig) -> Result<Self> {
        let mut registry = Self::new(config);
        for (id, record) in &snapshot.devices {
            let device = registry.add(id.get(), &record.name, record.weight)?;
            if device.partition_count != record.partition_count {
                return Err(Error::integrity(format!(
                    "device {} recorded {} partitions but weight {} yields {}",
                    id, record.partition_count, record.weight, device.partition_count
                )));
            }
        }
        Ok(registry)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let devices = self
            .devices
            .values()
            .map(|d| {
                (
                    d.id,
                    DeviceRecord {
                        name: d.name.clone(),
                        weight: d.weight,
                        partition_count: d.partition_count,
                    },
                )
            })
            .collect();
        RegistrySnapshot { devices }
    }

    /// Register a new device.
    ///
    /// Nothing is stored unless every check passes.
    pub fn add(&mut self, id: u64, name: &str, weight: u64) -> Result<Device> {
        let id = DeviceId::new(id)?;
        if self.devices.contains_key(&id) {
            return Err(Error::invalid(format!("id {} already exists", id)));
        }
        if name.is_empty() {
            return Err(Error::invalid("name must not be empty"));
        }
        self.config.check_weight(weight)?;
        let partition_count = self.config.partition_count(weight)?;

        let device = Device::new(id, name, weight, partition_count);
        self.devices.insert(id, device.clone());
        debug!(%id, name, weight, partition_count, "registered device");
        Ok(device)
    }

    /// Change a device's weight, returning `(old_partition_count, new_partition_count)`.
    pub fn update(&mut self, id: DeviceId, new_weight: u64) -> Result<(u32, u32)> {
        let config = &self.config;
        let device = self.devices.get_mut(&id).ok_or(Error::NotFound(id))?;
        config.check_weight(new_weight)?;
        if new_weight == device.weight && config.reject_unchanged_weight {
            return Err(Error::invalid(format!(
                "weight of device {} is already {}",
                id, new_weight
            )));
        }
        let new_count = config.partition_count(new_weight)?;

        let old_count = device.partition_count;
        device.weight = new_weight;
        device.partition_count = new_count;
        debug!(%id, new_weight, old_count, new_count, "updated device weight");
        Ok((old_count, new_count))
    }

    /// Unregister a device, returning the partition count it held.
    pub fn remove(&mut self, id: DeviceId) -> Result<u32> {
        let device = self.devices.remove(&id).ok_or(Error::NotFound(id))?;
        debug!(%id, partitions = device.partition_count, "unregistered device");
        Ok(device.partition_count)
    }

    /// Put a previously removed or modified device back verbatim.
    ///
    /// Only used to compensate a failed ring mutation.
    pub(crate) fn restore(&mut self, device: Device) {
        self.devices.insert(device.id, device);
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    /// The device with the lowest id.
    pub fn first(&self) -> Option<&Device> {
        self.devices.values().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }
}
