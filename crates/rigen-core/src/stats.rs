//! Running counters and the end-of-run summary.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Counters updated incrementally over a run; never reset mid-run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Finalized chains.
    pub num_chains: u64,
    /// Running mean length of finalized chains.
    pub avg_chain_length: f64,
    /// Successful creations (fresh or recycled).
    pub num_nodes_created: u64,
    /// Successful deletions.
    pub num_nodes_deleted: u64,
    /// Largest overlap estimate seen so far.
    pub max_num_parallel_chains: u64,
}

impl Statistics {
    /// Fold one finalized chain of `len` ids into the running mean.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_chain(&mut self, len: usize) {
        let total = self.avg_chain_length * self.num_chains as f64 + len as f64;
        self.num_chains += 1;
        self.avg_chain_length = total / self.num_chains as f64;
    }

    /// Raise the overlap maximum; returns `true` if it grew.
    pub fn observe_parallel(&mut self, estimate: usize) -> bool {
        let estimate = estimate as u64;
        if estimate > self.max_num_parallel_chains {
            self.max_num_parallel_chains = estimate;
            true
        } else {
            false
        }
    }
}

/// Everything a run reports at the end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Iterations executed.
    pub iterations: u64,
    /// Final counters.
    pub statistics: Statistics,
    /// Final arena size.
    pub num_nodes: NodeId,
    /// Final tombstoned ids, ascending.
    pub tombstoned: Vec<NodeId>,
}

impl Summary {
    /// The `#`-comment lines printed at the end of a trace (without the `# ` prefix).
    #[must_use]
    pub fn report_lines(&self) -> Vec<String> {
        let s = &self.statistics;
        let dead = self
            .tombstoned
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            "program statistics".to_owned(),
            format!(
                "numNodes {}, len(deletedNodes) {}",
                self.num_nodes,
                self.tombstoned.len()
            ),
            format!(
                "numChains {}, avgChainLength {:.6}",
                s.num_chains, s.avg_chain_length
            ),
            format!(
                "numNodesCreated {}, numNodesDeleted {}",
                s.num_nodes_created, s.num_nodes_deleted
            ),
            format!("maxNumParallelChains {}", s.max_num_parallel_chains),
            format!("deletedNodes = [{dead}]"),
        ]
    }
}
