//! JSON file snapshot store.
//!
//! Each snapshot lives in its own file. Writes are atomic: the document is
//! written to `<file>.tmp` first, then renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::PersistenceError;
use crate::snapshot::{RegistrySnapshot, RingSnapshot};
use crate::store::SnapshotStore;

/// Default registry snapshot file name.
pub const BUILDER_FILE: &str = "Builder.json";
/// Default ring snapshot file name.
pub const RING_FILE: &str = "Ring.json";

/// Snapshot store backed by two JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    builder_path: PathBuf,
    ring_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(builder_path: impl Into<PathBuf>, ring_path: impl Into<PathBuf>) -> Self {
        Self {
            builder_path: builder_path.into(),
            ring_path: ring_path.into(),
        }
    }

    /// Store using the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(BUILDER_FILE), dir.join(RING_FILE))
    }

    pub fn builder_path(&self) -> &Path {
        &self.builder_path
    }

    pub fn ring_path(&self) -> &Path {
        &self.ring_path
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, PersistenceError> {
    match fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)?;
            debug!(path = %path.display(), size = bytes.len(), "loaded snapshot");
            Ok(value)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot on disk, starting empty");
            Ok(T::default())
        }
        Err(e) => Err(PersistenceError::Io(e)),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let data = serde_json::to_vec(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, &data)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), size = data.len(), "saved snapshot");
    Ok(())
}

impl SnapshotStore for JsonFileStore {
    fn load_registry(&self) -> Result<RegistrySnapshot, PersistenceError> {
        read_json(&self.builder_path)
    }

    fn save_registry(&self, snapshot: &RegistrySnapshot) -> Result<(), PersistenceError> {
        write_json(&self.builder_path, snapshot)
    }

    fn load_ring(&self) -> Result<RingSnapshot, PersistenceError> {
        read_json(&self.ring_path)
    }

    fn save_ring(&self, snapshot: &RingSnapshot) -> Result<(), PersistenceError> {
        write_json(&self.ring_path, snapshot)
    }
}
