//! Core library for the weighted consistent-hash ring builder.
//!
//! This crate provides:
//! - MD5 tokens and the partitioner seam
//! - Devices and the device registry
//! - Virtual partitions and the hash ring
//! - The ring builder that keeps registry and ring in step
//! - Snapshot documents and the stores that persist them

pub mod config;
pub mod device;
pub mod error;
pub mod partitioner;
pub mod registry;
pub mod ring;
pub mod snapshot;
pub mod store;
pub mod token;
pub mod vnode;

pub use config::BuilderConfig;
pub use device::{Device, DeviceId};
pub use error::{Error, PersistenceError, Result};
pub use partitioner::{Md5Partitioner, Partitioner};
pub use registry::DeviceRegistry;
pub use ring::{HashRing, Ring, RingBuilder};
pub use snapshot::{DeviceRecord, RegistrySnapshot, RingSnapshot};
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
pub use token::Token;
pub use vnode::VirtualPartition;
