//! CLI tool for managing a ring builder.
//!
//! Provides commands for:
//! - Adding, re-weighting, and removing devices
//! - Rebalancing (verify and re-save) the ring
//! - Resolving a key to its device
//! - Listing registered devices

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
