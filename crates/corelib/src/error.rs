//! Error types for the core library.

use crate::device::DeviceId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad id, name, or weight shape, duplicate id, or a rejected no-op update.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation on a device id the registry does not know.
    #[error("device {0} not found")]
    NotFound(DeviceId),

    /// Registry and ring diverged (digest collision or missing ring entry).
    ///
    /// Not auto-repaired: resynchronize from a trusted snapshot.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Lookup with no devices registered at all.
    #[error("ring is empty and no devices are registered")]
    EmptyRing,

    /// Snapshot load or save failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Errors returned by [`SnapshotStore`](crate::store::SnapshotStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// I/O error reading or writing a snapshot file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding or decoding error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        Error::Integrity(msg.into())
    }
}
