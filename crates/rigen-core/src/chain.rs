//! Chain accumulation.
//!
//! Consecutive chain draws append live ids to the open chain. Drawing an id
//! that is already in the chain closes it (the repeated id is not appended
//! again). Create/delete draws force-close the chain before touching the
//! registry. A closed chain of length ≥ 2 is finalized into wiring
//! instructions; anything shorter is discarded.

use crate::registry::NodeRegistry;
use crate::types::{Instruction, NodeId};

/// What a single chain draw did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    /// The id is tombstoned; the chain is unchanged.
    SkippedTombstoned(NodeId),
    /// The id was appended; the chain now has `len` ids.
    Appended {
        /// Chain length after the append.
        len: usize,
    },
    /// The id repeated and the chain was closed.
    Closed(Closure),
}

/// A chain taken out of the builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Closure {
    /// Length ≥ 2; becomes wiring and a history entry.
    Finalized(Vec<NodeId>),
    /// Length ≤ 1; dropped with only a diagnostic.
    Discarded(usize),
}

/// The open chain (`Idle` when empty, `Building` otherwise).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainBuilder {
    current: Vec<NodeId>,
}

impl ChainBuilder {
    /// Empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Vec::new(),
        }
    }

    /// Ids accumulated so far.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &[NodeId] {
        &self.current
    }

    /// `true` while no id has been accumulated.
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.current.is_empty()
    }

    /// Feed one chain draw.
    pub fn push(&mut self, id: NodeId, registry: &NodeRegistry) -> ChainEvent {
        if registry.is_tombstoned(id) {
            ChainEvent::SkippedTombstoned(id)
        } else if self.current.contains(&id) {
            ChainEvent::Closed(self.close())
        } else {
            self.current.push(id);
            ChainEvent::Appended {
                len: self.current.len(),
            }
        }
    }

    /// Take the open chain, leaving the builder idle.
    pub fn close(&mut self) -> Closure {
        let chain = std::mem::take(&mut self.current);
        if chain.len() <= 1 {
            Closure::Discarded(chain.len())
        } else {
            Closure::Finalized(chain)
        }
    }
}

/// Producer → transmuter(s) → consumer wiring for a finalized chain.
///
/// Returns an empty list for chains shorter than two.
#[must_use]
pub fn wiring(chain: &[NodeId]) -> Vec<Instruction> {
    let n = chain.len();
    if n < 2 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(n);
    out.push(Instruction::Producer {
        id: chain[0],
        dst: chain[1],
    });
    out.extend(chain.windows(3).map(|w| Instruction::Transmuter {
        src: w[0],
        id: w[1],
        dst: w[2],
    }));
    out.push(Instruction::Consumer {
        src: chain[n - 2],
        id: chain[n - 1],
    });
    out
}
