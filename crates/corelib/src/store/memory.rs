//! In-process snapshot store.

use parking_lot::Mutex;

use crate::error::PersistenceError;
use crate::snapshot::{RegistrySnapshot, RingSnapshot};
use crate::store::SnapshotStore;

/// Snapshot store that keeps the last saved documents in memory.
///
/// Useful for tests and for embedding a ring that does not need to outlive
/// the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    registry: Mutex<RegistrySnapshot>,
    ring: Mutex<RingSnapshot>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store, as if a previous process had saved these snapshots.
    pub fn with_snapshots(registry: RegistrySnapshot, ring: RingSnapshot) -> Self {
        Self {
            registry: Mutex::new(registry),
            ring: Mutex::new(ring),
            saves: Mutex::new(0),
        }
    }

    pub fn registry(&self) -> RegistrySnapshot {
        self.registry.lock().clone()
    }

    pub fn ring(&self) -> RingSnapshot {
        self.ring.lock().clone()
    }

    /// Total number of successful saves of either document.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SnapshotStore for MemoryStore {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError> {
        Ok(self.registry())
    }

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        *self.registry.lock() = snapshot.clone();
        *self.saves.lock() += 1;
        Ok(())
    }

    fn load_ring(&self) -> Result<RingSnapshot, PersistenceError> {
        Ok(self.ring())
    }

    fn save_ring(&self, snapshot: &RingSnapshot) -> Result<(), PersistenceError> {
        *self.ring.lock() = snapshot.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}
