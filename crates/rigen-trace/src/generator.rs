// crates/rigen-trace/src/generator.rs

//! Deterministic driver loop.
//!
//! Each iteration draws one LFSR value, classifies it against the current
//! range partition, and applies the resulting opcode to the registry or the
//! chain builder. Everything the run decides is written to a [`TraceSink`] as
//! [`TraceLine`]s; the same configuration always yields the same lines.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use anyhow::Result;
use rigen_core::{
    wiring, ChainBuilder, ChainEvent, ChainHistory, Closure, DeleteOutcome, GeneratorConfig,
    Instruction, Lfsr, LfsrWord, NodeId, NodeRegistry, OpClass, Ranges, Statistics, Summary,
    TraceLine,
};
use tracing::{debug, info};

/// Destination for generated trace lines.
pub trait TraceSink {
    /// Accept one line, in trace order.
    fn emit(&mut self, line: TraceLine) -> Result<()>;
}

impl TraceSink for Vec<TraceLine> {
    #[inline]
    fn emit(&mut self, line: TraceLine) -> Result<()> {
        self.push(line);
        Ok(())
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    #[inline]
    fn emit(&mut self, line: TraceLine) -> Result<()> {
        (**self).emit(line)
    }
}

/// A fully decoded draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// Create (or recycle) a node.
    Create,
    /// Delete the given node.
    Delete(NodeId),
    /// Offer the given node to the open chain.
    Chain(NodeId),
    /// Nothing to do.
    Noop,
    /// The draw fell outside every range.
    Unknown(LfsrWord),
}

/// Random instruction generator state.
#[derive(Clone, Debug)]
pub struct Generator {
    config: GeneratorConfig,
    lfsr: Lfsr,
    ranges: Ranges,
    registry: NodeRegistry,
    chain: ChainBuilder,
    history: ChainHistory,
    stats: Statistics,
    iterations: u64,
}

impl Generator {
    /// Validate `config` and lay out the initial partition.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let lfsr = Lfsr::new(config.feed, config.seed)?;
        let ranges = Ranges::compute(
            lfsr.max_val(),
            config.create_prob,
            config.delete_prob,
            config.initial_nodes,
        )?;
        Ok(Self {
            config,
            lfsr,
            ranges,
            registry: NodeRegistry::new(config.initial_nodes)?,
            chain: ChainBuilder::new(),
            history: ChainHistory::new(),
            stats: Statistics::default(),
            iterations: 0,
        })
    }

    /// Run the configured number of iterations, then [`finish`](Self::finish).
    pub fn run<S: TraceSink>(&mut self, mut sink: S) -> Result<Summary> {
        info!(
            feed = self.config.feed,
            seed = self.config.seed,
            nodes = self.config.initial_nodes,
            length = self.config.sequence_length,
            "generating random instruction trace"
        );
        self.header(&mut sink)?;
        for _ in 0..self.config.sequence_length {
            self.step(&mut sink)?;
        }
        let summary = self.finish(&mut sink)?;
        info!(
            chains = summary.statistics.num_chains,
            created = summary.statistics.num_nodes_created,
            deleted = summary.statistics.num_nodes_deleted,
            parallel = summary.statistics.max_num_parallel_chains,
            "trace complete"
        );
        Ok(summary)
    }

    /// Emit the LFSR description and the initial partition.
    pub fn header<S: TraceSink>(&self, sink: &mut S) -> Result<()> {
        sink.emit(TraceLine::comment(format!(
            "lfsr of order {}, with range 1-{}",
            self.lfsr.order(),
            self.lfsr.max_val()
        )))?;
        emit_ranges(&self.ranges, sink)
    }

    /// Draw and decode the next opcode (a delete consumes a second draw).
    pub fn next_opcode(&mut self) -> Opcode {
        let prnum = self.lfsr.next_value();
        match self.ranges.classify(prnum) {
            OpClass::Create => Opcode::Create,
            OpClass::Delete => {
                let draw = self.lfsr.next_value();
                Opcode::Delete(self.ranges.delete_target(draw))
            }
            OpClass::Chain(id) => Opcode::Chain(id),
            OpClass::Noop => Opcode::Noop,
            OpClass::Unknown => Opcode::Unknown(prnum),
        }
    }

    /// One iteration of the main loop.
    pub fn step<S: TraceSink>(&mut self, sink: &mut S) -> Result<Opcode> {
        let op = self.next_opcode();
        self.apply(op, sink)?;
        self.iterations += 1;
        Ok(op)
    }

    /// Apply a decoded opcode to the current state.
    ///
    /// # Errors
    /// Only a failed range recompute (or a failing sink) is an error; every
    /// other anomaly is reported as a comment and the run continues.
    pub fn apply<S: TraceSink>(&mut self, op: Opcode, sink: &mut S) -> Result<()> {
        match op {
            Opcode::Create => self.handle_create(sink),
            Opcode::Delete(id) => self.handle_delete(id, sink),
            Opcode::Chain(id) => self.handle_chain(id, sink),
            Opcode::Noop => Ok(()),
            Opcode::Unknown(prnum) => {
                debug!(prnum, "draw outside every range");
                sink.emit(TraceLine::comment(format!("unclassified draw {prnum}")))
            }
        }
    }

    /// Force-close the open chain and emit the statistics block.
    pub fn finish<S: TraceSink>(&mut self, sink: &mut S) -> Result<Summary> {
        self.end_chain(sink)?;
        let summary = self.summary();
        for line in summary.report_lines() {
            sink.emit(TraceLine::comment(line))?;
        }
        Ok(summary)
    }

    /// Snapshot of the counters and registry as they stand.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            iterations: self.iterations,
            statistics: self.stats,
            num_nodes: self.registry.num_nodes(),
            tombstoned: self.registry.tombstoned().collect(),
        }
    }

    fn handle_chain<S: TraceSink>(&mut self, id: NodeId, sink: &mut S) -> Result<()> {
        match self.chain.push(id, &self.registry) {
            ChainEvent::SkippedTombstoned(id) => {
                debug!(id, "chain draw hit a tombstoned node");
                sink.emit(TraceLine::comment(format!("not chaining deleted node {id}")))
            }
            ChainEvent::Appended { .. } => Ok(()),
            ChainEvent::Closed(closure) => self.settle(closure, sink),
        }
    }

    fn handle_create<S: TraceSink>(&mut self, sink: &mut S) -> Result<()> {
        self.end_chain(sink)?;

        let responsible = self.registry.lowest_live();
        let alloc = self.registry.allocate();
        self.stats.num_nodes_created += 1;
        if alloc.grew {
            self.recompute_ranges(sink)?;
            sink.emit(TraceLine::comment(format!(
                "numNodes is now {}",
                self.registry.num_nodes()
            )))?;
        }
        sink.emit(TraceLine::comment(format!(
            "len(deletedNodes) {}",
            self.registry.tombstoned_len()
        )))?;
        sink.emit(
            Instruction::CreateNode {
                id: alloc.id,
                responsible,
            }
            .into(),
        )
    }

    fn handle_delete<S: TraceSink>(&mut self, id: NodeId, sink: &mut S) -> Result<()> {
        self.end_chain(sink)?;

        let before = self.registry.num_nodes();
        match self.registry.tombstone(id) {
            DeleteOutcome::AlreadyDeleted => {
                debug!(id, "delete of a tombstoned node");
                sink.emit(TraceLine::comment(format!("nodeID {id} is already deleted!")))
            }
            DeleteOutcome::LastLiveNode => {
                debug!(id, "refusing to delete the last live node");
                sink.emit(TraceLine::comment(format!(
                    "refusing to delete final node, {id}"
                )))
            }
            DeleteOutcome::OutOfRange => {
                debug!(id, num_nodes = before, "delete target out of range");
                sink.emit(TraceLine::comment(format!(
                    "nodeID {id} is out of range (numNodes {before})"
                )))
            }
            DeleteOutcome::Deleted { compacted_from } => {
                sink.emit(Instruction::DeleteNode { id }.into())?;
                self.stats.num_nodes_deleted += 1;
                sink.emit(TraceLine::comment(format!(
                    "len(deletedNodes) {}",
                    self.registry.tombstoned_len()
                )))?;
                if let Some(prev) = compacted_from {
                    sink.emit(TraceLine::comment(format!(
                        "newNumNodes {}, numNodes {prev}",
                        self.registry.num_nodes()
                    )))?;
                    self.recompute_ranges(sink)?;
                }
                Ok(())
            }
        }
    }

    fn end_chain<S: TraceSink>(&mut self, sink: &mut S) -> Result<()> {
        let closure = self.chain.close();
        self.settle(closure, sink)
    }

    fn settle<S: TraceSink>(&mut self, closure: Closure, sink: &mut S) -> Result<()> {
        match closure {
            Closure::Discarded(len) => sink.emit(TraceLine::comment(format!(
                "discarding a chain of length {len}"
            ))),
            Closure::Finalized(chain) => {
                sink.emit(TraceLine::comment(format!("create chain: {chain:?}")))?;
                for ins in wiring(&chain) {
                    sink.emit(ins.into())?;
                }
                self.stats.record_chain(chain.len());
                self.history.push(chain);

                let parallel = self.history.parallel_window();
                sink.emit(TraceLine::comment(format!("numParallelChains {parallel}")))?;
                self.stats.observe_parallel(parallel);
                Ok(())
            }
        }
    }

    fn recompute_ranges<S: TraceSink>(&mut self, sink: &mut S) -> Result<()> {
        match Ranges::compute(
            self.lfsr.max_val(),
            self.config.create_prob,
            self.config.delete_prob,
            self.registry.num_nodes(),
        ) {
            Ok(ranges) => {
                self.ranges = ranges;
                emit_ranges(&ranges, sink)
            }
            Err(e) => {
                sink.emit(TraceLine::comment(format!("error: {e}")))?;
                Err(e)
            }
        }
    }

    /// Configuration this generator was built from.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Current range partition.
    #[must_use]
    pub const fn ranges(&self) -> &Ranges {
        &self.ranges
    }

    /// Current registry.
    #[must_use]
    pub const fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Ids accumulated in the open chain.
    #[must_use]
    pub fn current_chain(&self) -> &[NodeId] {
        self.chain.current()
    }

    /// Finalized chains so far.
    #[must_use]
    pub const fn history(&self) -> &ChainHistory {
        &self.history
    }

    /// Running counters.
    #[must_use]
    pub const fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Iterations executed by [`step`](Self::step).
    #[must_use]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }
}

fn emit_ranges<S: TraceSink>(r: &Ranges, sink: &mut S) -> Result<()> {
    sink.emit(TraceLine::comment(format!("numNodes = {}", r.num_nodes)))?;
    sink.emit(TraceLine::comment(format!(
        "createRange = {}, deleteRange = {}",
        r.create, r.delete
    )))?;
    sink.emit(TraceLine::comment(format!(
        "chainRange = {}, noopRange = {}",
        r.chain, r.noop
    )))
}

/// Convenience: run `config` to completion and collect every line.
pub fn generate_trace(config: GeneratorConfig) -> Result<(Vec<TraceLine>, Summary)> {
    let mut lines = Vec::new();
    let summary = Generator::new(config)?.run(&mut lines)?;
    Ok((lines, summary))
}
