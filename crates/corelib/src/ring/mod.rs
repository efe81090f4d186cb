//! Consistent hash ring implementation.
//!
//! The ring manages virtual-partition tokens and provides successor lookup;
//! the builder keeps it consistent with the device registry.

pub mod builder;
pub mod ring;

pub use builder::RingBuilder;
pub use ring::HashRing;

/// Alias for the main ring type (used by lib.rs).
pub type Ring = HashRing;
