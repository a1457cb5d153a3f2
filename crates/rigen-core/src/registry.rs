//! Node identifier lifecycle.
//!
//! Ids form an arena of slots `0..num_nodes`; dead slots sit in an ordered
//! free-list (`tombstoned`). Creation recycles the smallest dead id before
//! growing the arena, and deletion trims the arena's high end while its top
//! slot is dead. At least one id is live at all times.

use crate::types::NodeId;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of [`NodeRegistry::allocate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// The id handed out.
    pub id: NodeId,
    /// `true` if the arena grew (no tombstone was available).
    pub grew: bool,
}

/// Result of [`NodeRegistry::tombstone`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The id was live and is now tombstoned.
    Deleted {
        /// Arena size before compaction, if compaction shrank it.
        compacted_from: Option<NodeId>,
    },
    /// The id was already tombstoned; nothing changed.
    AlreadyDeleted,
    /// The id is the last live node; nothing changed.
    LastLiveNode,
    /// The id lies outside `0..num_nodes`; nothing changed.
    OutOfRange,
}

/// Allocated / live / tombstoned node ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistry {
    num_nodes: NodeId,
    tombstoned: BTreeSet<NodeId>,
}

impl NodeRegistry {
    /// Registry with `num_nodes` live ids `0..num_nodes`.
    pub fn new(num_nodes: NodeId) -> Result<Self> {
        ensure!(num_nodes > 0, "registry needs at least one live node");
        Ok(Self {
            num_nodes,
            tombstoned: BTreeSet::new(),
        })
    }

    /// Number of allocated id slots.
    #[inline]
    #[must_use]
    pub const fn num_nodes(&self) -> NodeId {
        self.num_nodes
    }

    /// Number of tombstoned ids still occupying a slot.
    #[inline]
    #[must_use]
    pub fn tombstoned_len(&self) -> usize {
        self.tombstoned.len()
    }

    /// Tombstoned ids, ascending.
    pub fn tombstoned(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tombstoned.iter().copied()
    }

    /// Live node count (`num_nodes - |tombstoned|`).
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.num_nodes as usize - self.tombstoned.len()
    }

    /// `true` if `id` is tombstoned.
    #[inline]
    #[must_use]
    pub fn is_tombstoned(&self, id: NodeId) -> bool {
        self.tombstoned.contains(&id)
    }

    /// `true` if `id` is allocated and not tombstoned.
    #[inline]
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        id < self.num_nodes && !self.is_tombstoned(id)
    }

    /// Lowest live id; the node that would issue a creation.
    #[must_use]
    pub fn lowest_live(&self) -> NodeId {
        (0..self.num_nodes)
            .find(|id| !self.tombstoned.contains(id))
            .unwrap_or(0)
    }

    /// Smallest id the next [`allocate`](Self::allocate) would hand out.
    #[must_use]
    pub fn next_id(&self) -> NodeId {
        self.tombstoned.first().copied().unwrap_or(self.num_nodes)
    }

    /// Hand out an id: the smallest tombstone if any, otherwise `num_nodes`.
    pub fn allocate(&mut self) -> Allocation {
        if let Some(id) = self.tombstoned.pop_first() {
            Allocation { id, grew: false }
        } else {
            let id = self.num_nodes;
            self.num_nodes += 1;
            Allocation { id, grew: true }
        }
    }

    /// Tombstone `id`, then trim trailing dead slots.
    pub fn tombstone(&mut self, id: NodeId) -> DeleteOutcome {
        if id >= self.num_nodes {
            return DeleteOutcome::OutOfRange;
        }
        if self.tombstoned.contains(&id) {
            return DeleteOutcome::AlreadyDeleted;
        }
        if self.live_count() <= 1 {
            return DeleteOutcome::LastLiveNode;
        }
        self.tombstoned.insert(id);

        let before = self.num_nodes;
        while self.num_nodes > 0 && self.tombstoned.remove(&(self.num_nodes - 1)) {
            self.num_nodes -= 1;
        }
        DeleteOutcome::Deleted {
            compacted_from: (self.num_nodes < before).then_some(before),
        }
    }
}
