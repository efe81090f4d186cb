//! Ring builder configuration.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Tunables shared by the registry and the builder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Weights must be positive multiples of this value.
    pub weight_step: u64,
    /// Units of weight per virtual partition.
    ///
    /// `partition_count = weight / weight_per_partition`; the default of 50
    /// gives `floor(weight * 0.02)`.
    pub weight_per_partition: u64,
    /// Reject `update` calls that leave the weight unchanged.
    ///
    /// When false such an update succeeds without touching the ring.
    pub reject_unchanged_weight: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            weight_step: 100,
            weight_per_partition: 50,
            reject_unchanged_weight: true,
        }
    }
}

impl BuilderConfig {
    pub fn with_reject_unchanged_weight(mut self, reject: bool) -> Self {
        self.reject_unchanged_weight = reject;
        self
    }

    pub fn with_weight_step(mut self, step: u64) -> Self {
        self.weight_step = step;
        self
    }

    pub fn with_weight_per_partition(mut self, units: u64) -> Self {
        self.weight_per_partition = units;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.weight_step == 0 {
            return Err(Error::invalid("weight_step must be positive"));
        }
        if self.weight_per_partition == 0 {
            return Err(Error::invalid("weight_per_partition must be positive"));
        }
        Ok(())
    }

    /// Check a weight's shape: positive and a multiple of `weight_step`.
    pub fn check_weight(&self, weight: u64) -> Result<()> {
        if weight == 0 || weight % self.weight_step != 0 {
            return Err(Error::invalid(format!(
                "weight {} must be a positive multiple of {}",
                weight, self.weight_step
            )));
        }
        Ok(())
    }

    /// Partition count derived from a weight.
    pub fn partition_count(&self, weight: u64) -> Result<u32> {
        u32::try_from(weight / self.weight_per_partition)
            .map_err(|_| Error::invalid(format!("weight {} yields too many partitions", weight)))
    }
}
