//! Ring builder: keeps the device registry and the hash ring in step.
//!
//! Every mutation validates against the registry first, applies the matching
//! partition delta to the ring, then saves both snapshots. A mutation spans
//! two structures, so mutations take the write lock; lookups share the read
//! lock and never observe a half-applied delta. Snapshot writes happen after
//! the guard is downgraded, so lookups can proceed while a save is in flight
//! but no other mutation can start.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

use crate::config::BuilderConfig;
use crate::device::{Device, DeviceId};
use crate::error::{Error, Result};
use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::registry::DeviceRegistry;
use crate::ring::HashRing;
use crate::snapshot::{RegistrySnapshot, RingSnapshot};
use crate::store::SnapshotStore;

#[derive(Debug)]
struct State<P: Partitioner> {
    registry: DeviceRegistry,
    ring: HashRing<P>,
}

impl<P: Partitioner> State<P> {
    fn empty(config: BuilderConfig, partitioner: P) -> Self {
        Self {
            registry: DeviceRegistry::new(config),
            ring: HashRing::with_partitioner(partitioner),
        }
    }

    fn load<S: SnapshotStore>(store: &S, config: BuilderConfig, partitioner: P) -> Result<Self> {
        let registry_snapshot = store.load_registry()?;
        let ring_snapshot = store.load_ring()?;

        let registry = DeviceRegistry::from_snapshot(&registry_snapshot, config)?;
        let ring = HashRing::from_snapshot(&ring_snapshot, partitioner);
        let state = Self { registry, ring };
        state.verify()?;
        debug!(
            devices = state.registry.len(),
            partitions = state.ring.token_count(),
            "loaded snapshots"
        );
        Ok(state)
    }

    fn verify(&self) -> Result<()> {
        self.ring
            .verify(self.registry.iter().map(|d| (d.id, d.partition_count)))
    }

    fn record_gauges(&self) {
        metrics::gauge!("ringbuilder_devices").set(self.registry.len() as f64);
        metrics::gauge!("ringbuilder_partitions").set(self.ring.token_count() as f64);
    }
}

/// Orchestrates a [`DeviceRegistry`] and a [`HashRing`] behind one lock and
/// persists both through a [`SnapshotStore`].
pub struct RingBuilder<S: SnapshotStore, P: Partitioner = Md5Partitioner> {
    state: RwLock<State<P>>,
    store: S,
    config: BuilderConfig,
}

impl<S: SnapshotStore> RingBuilder<S, Md5Partitioner> {
    /// Empty builder; nothing is loaded from `store`.
    pub fn new(store: S, config: BuilderConfig) -> Result<Self> {
        Self::with_partitioner(store, config, Md5Partitioner)
    }

    /// Builder restored from the snapshots in `store`.
    pub fn open(store: S, config: BuilderConfig) -> Result<Self> {
        Self::open_with_partitioner(store, config, Md5Partitioner)
    }
}

impl<S: SnapshotStore, P: Partitioner + Clone> RingBuilder<S, P> {
    pub fn with_partitioner(store: S, config: BuilderConfig, partitioner: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(State::empty(config.clone(), partitioner)),
            store,
            config,
        })
    }

    pub fn open_with_partitioner(store: S, config: BuilderConfig, partitioner: P) -> Result<Self> {
        config.validate()?;
        let state = State::load(&store, config.clone(), partitioner)?;
        state.record_gauges();
        info!(
            devices = state.registry.len(),
            partitions = state.ring.token_count(),
            "ring builder opened"
        );
        Ok(Self {
            state: RwLock::new(state),
            store,
            config,
        })
    }

    /// Register a device and place its partitions on the ring.
    pub fn add_device(&self, id: u64, name: &str, weight: u64) -> Result<Device> {
        let mut state = self.state.write();
        let device = state.registry.add(id, name, weight)?;

        if let Err(e) = state.ring.insert_partitions(device.id, 0..device.partition_count) {
            warn!(id = %device.id, error = %e, "ring insert failed, rolling back registry");
            if let Err(rollback) = state.registry.remove(device.id) {
                error!(id = %device.id, error = %rollback, "registry rollback failed");
            }
            return Err(e);
        }

        metrics::counter!("ringbuilder_mutations_total", "op" => "add").increment(1);
        info!(id = %device.id, name, weight, partitions = device.partition_count, "added device");
        self.persist(state)?;
        Ok(device)
    }

    /// Change a device's weight, growing or shrinking its partition range
    /// from the top. Returns `(old_partition_count, new_partition_count)`.
    pub fn update_device(&self, id: DeviceId, new_weight: u64) -> Result<(u32, u32)> {
        let mut state = self.state.write();
        let previous = state.registry.get(id).cloned().ok_or(Error::NotFound(id))?;
        let (old_count, new_count) = state.registry.update(id, new_weight)?;

        let applied = match new_count.cmp(&old_count) {
            Ordering::Greater => state.ring.insert_partitions(id, old_count..new_count),
            Ordering::Less => state.ring.remove_partitions(id, new_count..old_count),
            Ordering::Equal => Ok(()),
        };
        if let Err(e) = applied {
            warn!(%id, error = %e, "ring update failed, restoring previous weight");
            state.registry.restore(previous);
            return Err(e);
        }

        metrics::counter!("ringbuilder_mutations_total", "op" => "update").increment(1);
        info!(%id, new_weight, old_count, new_count, "updated device");
        self.persist(state)?;
        Ok((old_count, new_count))
    }

    /// Unregister a device and drop its partitions from the ring. Returns the
    /// partition count it held.
    pub fn remove_device(&self, id: DeviceId) -> Result<u32> {
        let mut state = self.state.write();
        let previous = state.registry.get(id).cloned().ok_or(Error::NotFound(id))?;
        let count = state.registry.remove(id)?;

        if let Err(e) = state.ring.remove_partitions(id, 0..count) {
            warn!(%id, error = %e, "ring removal failed, restoring device");
            state.registry.restore(previous);
            return Err(e);
        }

        metrics::counter!("ringbuilder_mutations_total", "op" => "remove").increment(1);
        info!(%id, partitions = count, "removed device");
        self.persist(state)?;
        Ok(count)
    }

    /// Resolve a key to a device.
    ///
    /// Falls back to the lowest registered id when the ring has no entries,
    /// and fails with [`Error::EmptyRing`] when there are no devices at all.
    pub fn lookup(&self, key: &[u8]) -> Result<DeviceId> {
        let state = self.state.read();
        metrics::counter!("ringbuilder_lookups_total").increment(1);
        if let Some(id) = state.ring.lookup(key) {
            return Ok(id);
        }
        match state.registry.first() {
            Some(device) => {
                debug!(id = %device.id, "ring empty, falling back to first registered device");
                Ok(device.id)
            }
            None => Err(Error::EmptyRing),
        }
    }

    /// Verify the ring against the registry and re-save the ring snapshot.
    ///
    /// Idempotent; never changes ownership.
    pub fn rebalance(&self) -> Result<()> {
        let state = self.state.write();
        state.verify()?;
        let state = RwLockWriteGuard::downgrade(state);
        self.store.save_ring(&state.ring.snapshot()).map_err(|e| {
            warn!(error = %e, "failed to save ring snapshot");
            Error::from(e)
        })?;
        metrics::counter!("ringbuilder_mutations_total", "op" => "rebalance").increment(1);
        info!(partitions = state.ring.token_count(), "rebalanced ring");
        Ok(())
    }

    /// Check that every registered device owns exactly its partitions.
    pub fn verify(&self) -> Result<()> {
        self.state.read().verify()
    }

    /// Replace in-memory state with what the store currently holds.
    ///
    /// On failure the current state is kept.
    pub fn reload(&self) -> Result<()> {
        let mut state = self.state.write();
        let partitioner = state.ring.partitioner().clone();
        let fresh = State::load(&self.store, self.config.clone(), partitioner)?;
        *state = fresh;
        state.record_gauges();
        info!(
            devices = state.registry.len(),
            partitions = state.ring.token_count(),
            "reloaded from snapshots"
        );
        Ok(())
    }

    fn persist(&self, state: RwLockWriteGuard<'_, State<P>>) -> Result<()> {
        let state = RwLockWriteGuard::downgrade(state);
        state.record_gauges();

        let saved = self
            .store
            .save_registry(&state.registry.snapshot())
            .and_then(|()| self.store.save_ring(&state.ring.snapshot()));
        if let Err(e) = saved {
            warn!(error = %e, "failed to save snapshots; in-memory state is ahead of the store");
            return Err(e.into());
        }
        Ok(())
    }

    pub fn device(&self, id: DeviceId) -> Option<Device> {
        self.state.read().registry.get(id).cloned()
    }

    /// All devices, ascending by id.
    pub fn devices(&self) -> Vec<Device> {
        self.state.read().registry.iter().cloned().collect()
    }

    pub fn device_count(&self) -> usize {
        self.state.read().registry.len()
    }

    /// Total number of ring entries.
    pub fn partition_total(&self) -> usize {
        self.state.read().ring.token_count()
    }

    /// Ring entries owned by each device.
    pub fn ownership(&self) -> BTreeMap<DeviceId, usize> {
        self.state.read().ring.ownership()
    }

    pub fn registry_snapshot(&self) -> RegistrySnapshot {
        self.state.read().registry.snapshot()
    }

    pub fn ring_snapshot(&self) -> RingSnapshot {
        self.state.read().ring.snapshot()
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: SnapshotStore, P: Partitioner> std::fmt::Debug for RingBuilder<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RingBuilder")
            .field("devices", &state.registry.len())
            .field("partitions", &state.ring.token_count())
            .field("partitioner", &state.ring.partitioner_name())
            .finish()
    }
}
