//! Generator parameters.
//!
//! A run is a pure function of these six values. Defaults reproduce the
//! classic workload: a 16-bit feed, seed 1, 1% create / 1% delete, 100
//! initial nodes and 100 000 iterations.

use crate::lfsr::{Lfsr, LfsrWord};
use crate::ranges::Ranges;
use crate::types::NodeId;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Default feedback polynomial (order 16).
pub const DEFAULT_FEED: LfsrWord = 0xF82F;
/// Default initial register value.
pub const DEFAULT_SEED: LfsrWord = 1;
/// Default create / delete probability.
pub const DEFAULT_PROBABILITY: f64 = 0.01;
/// Default number of initial nodes.
pub const DEFAULT_INITIAL_NODES: NodeId = 100;
/// Default iteration count.
pub const DEFAULT_SEQUENCE_LENGTH: u64 = 100_000;

/// Parameters for one generator run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// LFSR feedback polynomial (non-zero).
    pub feed: LfsrWord,
    /// Initial LFSR register.
    pub seed: LfsrWord,
    /// Probability mass of the create slice, in `[0, 1]`.
    pub create_prob: f64,
    /// Probability mass of the delete slice, in `[0, 1]`.
    pub delete_prob: f64,
    /// Nodes alive at start (`>= 1`).
    pub initial_nodes: NodeId,
    /// Iterations of the main loop.
    pub sequence_length: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            feed: DEFAULT_FEED,
            seed: DEFAULT_SEED,
            create_prob: DEFAULT_PROBABILITY,
            delete_prob: DEFAULT_PROBABILITY,
            initial_nodes: DEFAULT_INITIAL_NODES,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
        }
    }
}

impl GeneratorConfig {
    /// Check parameter domains and that the initial partition is usable.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.feed != 0, "feed polynomial must be non-zero");
        ensure!(
            (0.0..=1.0).contains(&self.create_prob),
            "create_prob must be in [0, 1], got {}",
            self.create_prob
        );
        ensure!(
            (0.0..=1.0).contains(&self.delete_prob),
            "delete_prob must be in [0, 1], got {}",
            self.delete_prob
        );
        ensure!(
            self.create_prob + self.delete_prob <= 1.0,
            "create_prob + delete_prob must not exceed 1, got {}",
            self.create_prob + self.delete_prob
        );
        ensure!(self.initial_nodes > 0, "initial_nodes must be at least 1");

        let lfsr = Lfsr::new(self.feed, self.seed)?;
        Ranges::compute(
            lfsr.max_val(),
            self.create_prob,
            self.delete_prob,
            self.initial_nodes,
        )
        .context("initial range partition")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        GeneratorConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_probabilities() {
        let mut c = GeneratorConfig::default();
        c.create_prob = -0.1;
        assert!(c.validate().is_err());
        c.create_prob = 0.6;
        c.delete_prob = 0.6;
        assert!(c.validate().is_err());
        c.create_prob = f64::NAN;
        c.delete_prob = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_zero_feed_and_nodes() {
        let c = GeneratorConfig { feed: 0, ..GeneratorConfig::default() };
        assert!(c.validate().is_err());
        let c = GeneratorConfig { initial_nodes: 0, ..GeneratorConfig::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_feed_too_small_for_node_count() {
        let c = GeneratorConfig {
            feed: 7,
            create_prob: 0.0,
            delete_prob: 0.0,
            initial_nodes: 8,
            ..GeneratorConfig::default()
        };
        let err = c.validate().unwrap_err();
        assert!(format!("{err:#}").contains("lfsr order is too small"));
    }
}
