//! Probability-range partition of `[1, max_val]` and opcode classification.
//!
//! ```text
//!  1 ........ c | ........ d | ............ chain ............ | ... noop ... | max_val
//!    create       delete       (a multiple of num_nodes)
//! ```
//!
//! `chain` is the largest multiple of `num_nodes` that fits after the create
//! and delete slices, so chain draws map uniformly onto `0..num_nodes`. A
//! partition is tied to the `num_nodes` it was computed for and must be
//! recomputed whenever that count changes.

use crate::lfsr::LfsrWord;
use crate::types::NodeId;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Raw opcode class of a single draw, before any registry state is consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpClass {
    /// Create a node.
    Create,
    /// Delete a node (the target comes from one extra draw).
    Delete,
    /// Extend the current chain with the given node.
    Chain(NodeId),
    /// Do nothing.
    Noop,
    /// Outside every range; unreachable while the ranges sum to `max_val`.
    Unknown,
}

/// One partition of `[1, max_val]`, valid for exactly `num_nodes` nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranges {
    /// Upper end of the draw space.
    pub max_val: LfsrWord,
    /// Node count this partition was computed for.
    pub num_nodes: NodeId,
    /// Width of the create slice.
    pub create: LfsrWord,
    /// Width of the delete slice.
    pub delete: LfsrWord,
    /// Width of the chain slice (multiple of `num_nodes`).
    pub chain: LfsrWord,
    /// Whatever is left over.
    pub noop: LfsrWord,
}

impl Ranges {
    /// Lay out the four slices for `num_nodes` live id slots.
    ///
    /// # Errors
    /// Fails when the chain slice comes out empty (the feed order is too
    /// small for `num_nodes`), or when the create/delete slices overrun
    /// `max_val`.
    pub fn compute(
        max_val: LfsrWord,
        create_prob: f64,
        delete_prob: f64,
        num_nodes: NodeId,
    ) -> Result<Self> {
        ensure!(num_nodes > 0, "ranges need at least one node slot");

        let create = scaled(max_val, create_prob);
        let delete = scaled(max_val, delete_prob);
        let rest = max_val
            .checked_sub(create)
            .and_then(|r| r.checked_sub(delete))
            .with_context(|| {
                format!("create ({create}) and delete ({delete}) ranges exceed max value {max_val}")
            })?;

        let n = LfsrWord::from(num_nodes);
        let chain = (rest / n) * n;
        let noop = rest - chain;

        if chain == 0 {
            bail!(
                "lfsr order is too small: no chain range left for {num_nodes} nodes (max value {max_val}, create {create}, delete {delete})"
            );
        }

        Ok(Self {
            max_val,
            num_nodes,
            create,
            delete,
            chain,
            noop,
        })
    }

    /// Sum of all four slices; equals `max_val` for every computed partition.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> LfsrWord {
        self.create + self.delete + self.chain + self.noop
    }

    /// Classify a draw against the cumulative thresholds, in strict order.
    ///
    /// Draws are expected in `[1, max_val]`. A degenerate draw of 0 (an LFSR
    /// stuck at its fixed point) is still classified deterministically.
    #[must_use]
    pub fn classify(&self, prnum: LfsrWord) -> OpClass {
        let mut rem = i128::from(prnum);

        if self.create > 0 && rem <= i128::from(self.create) {
            return OpClass::Create;
        }
        rem -= i128::from(self.create);

        if self.delete > 0 && rem <= i128::from(self.delete) {
            return OpClass::Delete;
        }
        rem -= i128::from(self.delete);

        if rem <= i128::from(self.chain) {
            return OpClass::Chain(self.node_index(rem - 1));
        }
        rem -= i128::from(self.chain);

        if rem <= i128::from(self.noop) {
            OpClass::Noop
        } else {
            OpClass::Unknown
        }
    }

    /// Target of a delete from its extra draw, biased toward low ids.
    #[inline]
    #[must_use]
    pub fn delete_target(&self, draw: LfsrWord) -> NodeId {
        self.node_index(i128::from(draw) - 1)
    }

    fn node_index(&self, v: i128) -> NodeId {
        let idx = v.rem_euclid(i128::from(self.num_nodes));
        // Bounded by num_nodes, so it always fits.
        NodeId::try_from(idx).unwrap_or(NodeId::MAX)
    }
}

// Rounds half away from zero.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scaled(max_val: LfsrWord, prob: f64) -> LfsrWord {
    (max_val as f64 * prob).round() as LfsrWord
}
