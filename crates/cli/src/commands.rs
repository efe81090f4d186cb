//! Subcommands and their execution against a ring builder.

use std::fmt;

use anyhow::{bail, Context};
use clap::Subcommand;
use corelib::{DeviceId, RingBuilder, SnapshotStore};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register a device and place its partitions on the ring.
    Add {
        /// Positive device id.
        id: u64,
        /// Device name.
        name: String,
        /// Weight, a positive multiple of 100.
        weight: u64,
    },
    /// Change a device's weight.
    Update { id: u64, weight: u64 },
    /// Remove a device and its partitions.
    Remove { id: u64 },
    /// Verify the ring against the registry and re-save it.
    Rebalance,
    /// Print the id of the device a key maps to.
    Hash { key: String },
    /// List registered devices.
    List,
}

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRow {
    pub id: DeviceId,
    pub name: String,
    pub weight: u64,
    pub partitions: u32,
    pub ring_entries: usize,
}

/// What a command produced, rendered by `Display` for stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Mutation succeeded; nothing to print.
    Done,
    Device(DeviceId),
    Devices(Vec<DeviceRow>),
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Done => Ok(()),
            CommandResult::Device(id) => write!(f, "{}", id),
            CommandResult::Devices(rows) => {
                writeln!(f, "{:>6}  {:<16} {:>8} {:>10} {:>8}", "id", "name", "weight", "partitions", "ring")?;
                for row in rows {
                    writeln!(
                        f,
                        "{:>6}  {:<16} {:>8} {:>10} {:>8}",
                        row.id, row.name, row.weight, row.partitions, row.ring_entries
                    )?;
                }
                Ok(())
            }
        }
    }
}

pub fn execute<S: SnapshotStore>(builder: &RingBuilder<S>, command: &Command) -> anyhow::Result<CommandResult> {
    match command {
        Command::Add { id, name, weight } => {
            builder
                .add_device(*id, name, *weight)
                .with_context(|| format!("failed to add device {}", id))?;
        }
        Command::Update { id, weight } => {
            builder
                .update_device(DeviceId(*id), *weight)
                .with_context(|| format!("failed to update device {}", id))?;
        }
        Command::Remove { id } => {
            builder
                .remove_device(DeviceId(*id))
                .with_context(|| format!("failed to remove device {}", id))?;
        }
        Command::Rebalance => {
            builder.rebalance().context("failed to rebalance ring")?;
        }
        Command::Hash { key } => {
            if key.is_empty() {
                bail!("key must not be empty");
            }
            let id = builder
                .lookup(key.as_bytes())
                .with_context(|| format!("failed to hash key {:?}", key))?;
            return Ok(CommandResult::Device(id));
        }
        Command::List => {
            let ownership = builder.ownership();
            let rows = builder
                .devices()
                .into_iter()
                .map(|d| DeviceRow {
                    ring_entries: ownership.get(&d.id).copied().unwrap_or(0),
                    id: d.id,
                    name: d.name,
                    weight: d.weight,
                    partitions: d.partition_count,
                })
                .collect();
            return Ok(CommandResult::Devices(rows));
        }
    }
    Ok(CommandResult::Done)
}
