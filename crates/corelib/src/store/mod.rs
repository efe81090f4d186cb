//! Persistence for registry and ring snapshots.
//!
//! The builder saves both snapshots after every mutation and loads them at
//! startup. Stores only have to round-trip the documents exactly; they are
//! not responsible for keeping the two consistent.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::PersistenceError;
use crate::snapshot::{RegistrySnapshot, RingSnapshot};

/// Durable home for the registry and ring snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the registry snapshot; an absent snapshot loads as empty.
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError>;

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError>;

    /// Load the ring snapshot; an absent snapshot loads as empty.
    fn load_ring(&self) -> Result<RingSnapshot, PersistenceError>;

    fn save_ring(&self, snapshot: &RingSnapshot) -> Result<(), PersistenceError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError> {
        (**self).load_registry()
    }

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        (**self).save_registry(snapshot)
    }

    fn load_ring(&self) -> Result<RingSnapshot, PersistenceError> {
        (**self).load_ring()
    }

    fn save_ring(&self, snapshot: &RingSnapshot) -> Result<(), PersistenceError> {
        (**self).save_ring(snapshot)
    }
}
