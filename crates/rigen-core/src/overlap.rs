//! Chain history and the trailing-window overlap estimator.
//!
//! The estimate is the size of the largest trailing window of finalized
//! chains that are pairwise node-disjoint, found by growing the window
//! backward one chain at a time and stopping at the first collision. This is
//! a heuristic, not a maximum independent set over the overlap graph, and
//! the reported statistic is defined by exactly this procedure.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Append-only list of finalized chains.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHistory {
    chains: Vec<Vec<NodeId>>,
}

impl ChainHistory {
    /// Empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self { chains: Vec::new() }
    }

    /// Record a finalized chain.
    pub fn push(&mut self, chain: Vec<NodeId>) {
        debug_assert!(chain.len() >= 2, "only finalized chains enter history");
        self.chains.push(chain);
    }

    /// Number of recorded chains.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// `true` if no chain has been finalized yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Recorded chains, oldest first.
    #[must_use]
    pub fn chains(&self) -> &[Vec<NodeId>] {
        &self.chains
    }

    /// Size of the largest collision-free trailing window.
    ///
    /// Returns 0 for an empty history and 1 for a single chain.
    #[must_use]
    pub fn parallel_window(&self) -> usize {
        let n = self.chains.len();
        if n <= 1 {
            return n;
        }

        // Window is chains[start..n]; try to extend it with chains[start - 1].
        let mut window = 1;
        for start in (1..n).rev() {
            let candidate = &self.chains[start - 1];
            let collides = self.chains[start..]
                .iter()
                .rev()
                .any(|other| shares_node(other, candidate));
            if collides {
                return window;
            }
            window = n - start + 1;
        }
        window
    }
}

fn shares_node(a: &[NodeId], b: &[NodeId]) -> bool {
    a.iter().any(|id| b.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(chains: &[&[NodeId]]) -> ChainHistory {
        let mut h = ChainHistory::new();
        for c in chains {
            h.push(c.to_vec());
        }
        h
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(ChainHistory::new().parallel_window(), 0);
        assert_eq!(history(&[&[1, 2]]).parallel_window(), 1);
    }

    #[test]
    fn all_disjoint_reports_full_history() {
        let h = history(&[&[0, 1], &[2, 3], &[4, 5, 6]]);
        assert_eq!(h.parallel_window(), 3);
    }

    #[test]
    fn stops_at_first_collision_from_the_back() {
        // [7,8] collides with the newest chain, so only the last two count.
        let h = history(&[&[0, 1], &[7, 8], &[2, 3], &[8, 9]]);
        assert_eq!(h.parallel_window(), 2);
    }

    #[test]
    fn adjacent_overlap_yields_one() {
        let h = history(&[&[3, 1, 0], &[1, 0, 3]]);
        assert_eq!(h.parallel_window(), 1);
    }

    #[test]
    fn older_disjoint_chains_do_not_count_after_a_collision() {
        // {[2,3],[4,5],[1,9]} is disjoint, but the trailing window stops at [0,1].
        let h = history(&[&[2, 3], &[4, 5], &[0, 1], &[1, 9]]);
        assert_eq!(h.parallel_window(), 1);
    }
}
