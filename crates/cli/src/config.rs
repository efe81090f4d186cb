//! Command-line configuration.
//!
//! Every option can also come from the environment; flags win.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corelib::{BuilderConfig, JsonFileStore, RingBuilder};
use tracing::debug;

use crate::commands::{self, Command, CommandResult};

#[derive(Parser, Debug)]
#[command(
    name = "ringbuilder",
    version,
    about = "Build and query a weighted consistent-hash ring"
)]
pub struct CliConfig {
    /// Registry snapshot file.
    #[arg(long, global = true, env = "RINGBUILDER_BUILDER_FILE", default_value = "Builder.json")]
    pub builder_file: PathBuf,

    /// Ring snapshot file.
    #[arg(long, global = true, env = "RINGBUILDER_RING_FILE", default_value = "Ring.json")]
    pub ring_file: PathBuf,

    /// Log level filter used when RUST_LOG is unset (e.g. "info", "debug").
    #[arg(long, global = true, env = "RINGBUILDER_LOG", default_value = "warn")]
    pub log_level: String,

    /// Accept `update` with the device's current weight as a no-op.
    #[arg(long, global = true)]
    pub allow_unchanged_weight: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig::default().with_reject_unchanged_weight(!self.allow_unchanged_weight)
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.builder_file, &self.ring_file)
    }

    /// Load the ring from disk and execute the subcommand against it.
    pub fn run(&self) -> anyhow::Result<CommandResult> {
        debug!(
            builder_file = %self.builder_file.display(),
            ring_file = %self.ring_file.display(),
            "opening ring builder"
        );
        let builder = RingBuilder::open(self.store(), self.builder_config())
            .context("failed to load ring snapshots")?;
        commands::execute(&builder, &self.command)
    }
}
