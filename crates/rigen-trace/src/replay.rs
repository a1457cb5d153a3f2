//! Replay a trace against a node liveness model.
//!
//! [`TraceReplayer`] consumes trace lines the way the dataflow runtime under
//! test would and rejects anything that runtime could not execute:
//! - `DoCreateNode new resp`: `resp` is live; `new` is the smallest tombstone
//!   or the next fresh id.
//! - `DoDeleteNode id`: `id` is live and not the last live node.
//! - `DoProducerNode` opens a chain, each `DoTransmuterNode` continues it from
//!   the previous hop, and `DoConsumerNode` closes it. Chain members are
//!   live and distinct, and create/delete never interleave with an open chain.
//!
//! Comments are counted and otherwise ignored.
//!
//! A trace only replays from the node count it was generated with.
//! [`replay_file`] takes it from the envelope's config (JSON/CBOR) or from the
//! `# numNodes = N` header line (text) unless the caller overrides it.

use crate::format::TraceFile;
use crate::io::{read_trace_cbor, read_trace_json, stream_trace_text, TraceEncoding};
use anyhow::{bail, ensure, Context, Result};
use rigen_core::{DeleteOutcome, Instruction, NodeId, NodeRegistry, TraceLine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Counts gathered while replaying.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Instruction lines accepted.
    pub instructions: u64,
    /// Comment lines skipped.
    pub comments: u64,
    /// Chains wired end to end.
    pub chains: u64,
    /// `DoCreateNode` lines.
    pub nodes_created: u64,
    /// `DoDeleteNode` lines.
    pub nodes_deleted: u64,
    /// Arena size after the last line.
    pub final_nodes: NodeId,
    /// Peak number of simultaneously live nodes.
    pub max_live_nodes: u64,
}

#[derive(Clone, Debug)]
struct OpenChain {
    members: Vec<NodeId>,
}

impl OpenChain {
    fn prev(&self) -> NodeId {
        self.members[self.members.len() - 2]
    }

    fn head(&self) -> NodeId {
        self.members[self.members.len() - 1]
    }
}

/// Incremental trace checker.
#[derive(Clone, Debug)]
pub struct TraceReplayer {
    registry: NodeRegistry,
    open: Option<OpenChain>,
    report: ReplayReport,
}

impl TraceReplayer {
    /// Start from `initial_nodes` live nodes, as the generator does.
    pub fn new(initial_nodes: NodeId) -> Result<Self> {
        let registry = NodeRegistry::new(initial_nodes)?;
        let report = ReplayReport {
            final_nodes: initial_nodes,
            max_live_nodes: registry.live_count() as u64,
            ..ReplayReport::default()
        };
        Ok(Self {
            registry,
            open: None,
            report,
        })
    }

    /// Liveness model as replayed so far.
    #[must_use]
    pub const fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Check and apply one line.
    pub fn feed(&mut self, line: &TraceLine) -> Result<()> {
        match line {
            TraceLine::Comment(_) => {
                self.report.comments += 1;
                Ok(())
            }
            TraceLine::Instruction(ins) => {
                self.instruction(*ins)?;
                self.report.instructions += 1;
                Ok(())
            }
        }
    }

    fn instruction(&mut self, ins: Instruction) -> Result<()> {
        if !ins.is_wiring() {
            ensure!(
                self.open.is_none(),
                "`{ins}` while a chain is still being wired"
            );
        }

        match ins {
            Instruction::CreateNode { id, responsible } => {
                ensure!(
                    self.registry.is_live(responsible),
                    "responsible node {responsible} is not live"
                );
                let expected = self.registry.next_id();
                ensure!(
                    id == expected,
                    "created node {id}, expected {expected} (smallest free id)"
                );
                self.registry.allocate();
                self.report.nodes_created += 1;
                self.report.max_live_nodes = self
                    .report
                    .max_live_nodes
                    .max(self.registry.live_count() as u64);
            }
            Instruction::DeleteNode { id } => match self.registry.tombstone(id) {
                DeleteOutcome::Deleted { .. } => self.report.nodes_deleted += 1,
                DeleteOutcome::AlreadyDeleted => bail!("node {id} is already deleted"),
                DeleteOutcome::LastLiveNode => bail!("node {id} is the last live node"),
                DeleteOutcome::OutOfRange => bail!(
                    "node {id} was never allocated (numNodes {})",
                    self.registry.num_nodes()
                ),
            },
            Instruction::Producer { id, dst } => {
                ensure!(self.open.is_none(), "producer {id} opened inside another chain");
                self.ensure_live(id)?;
                self.ensure_live(dst)?;
                ensure!(id != dst, "producer {id} wired to itself");
                self.open = Some(OpenChain {
                    members: vec![id, dst],
                });
            }
            Instruction::Transmuter { src, id, dst } => {
                let chain = self.expect_hop(src, id)?;
                ensure!(
                    !chain.members.contains(&dst),
                    "transmuter {id} loops back to chain member {dst}"
                );
                chain.members.push(dst);
                self.ensure_live(dst)?;
            }
            Instruction::Consumer { src, id } => {
                self.expect_hop(src, id)?;
                self.open = None;
                self.report.chains += 1;
            }
        }
        self.report.final_nodes = self.registry.num_nodes();
        Ok(())
    }

    fn ensure_live(&self, id: NodeId) -> Result<()> {
        ensure!(self.registry.is_live(id), "node {id} is not live");
        Ok(())
    }

    fn expect_hop(&mut self, src: NodeId, id: NodeId) -> Result<&mut OpenChain> {
        let chain = self
            .open
            .as_mut()
            .with_context(|| format!("node {id} wired without an open producer"))?;
        ensure!(
            chain.prev() == src && chain.head() == id,
            "hop {src} -> ({id}) does not continue chain {:?}",
            chain.members
        );
        Ok(chain)
    }

    /// Finish the replay; no chain may be left half-wired.
    pub fn finish(self) -> Result<ReplayReport> {
        if let Some(chain) = self.open {
            bail!("trace ends inside chain {:?}", chain.members);
        }
        Ok(self.report)
    }
}

/// Replay numbered lines (as yielded by [`crate::io::TraceLineIter`]).
pub fn replay_numbered<I>(initial_nodes: NodeId, lines: I) -> Result<ReplayReport>
where
    I: IntoIterator<Item = Result<(usize, TraceLine)>>,
{
    let mut r = TraceReplayer::new(initial_nodes)?;
    for item in lines {
        let (line_no, line) = item?;
        r.feed(&line)
            .with_context(|| format!("replay failed at line {line_no}"))?;
    }
    r.finish()
}

/// Replay an in-memory trace.
pub fn replay_lines<'a, I>(initial_nodes: NodeId, lines: I) -> Result<ReplayReport>
where
    I: IntoIterator<Item = &'a TraceLine>,
{
    replay_numbered(
        initial_nodes,
        lines
            .into_iter()
            .enumerate()
            .map(|(i, l)| Ok((i + 1, l.clone()))),
    )
}

/// Replay an envelope from its own `initial_nodes`, or from `nodes` if given.
pub fn replay_envelope(tf: &TraceFile, nodes: Option<NodeId>) -> Result<ReplayReport> {
    replay_lines(nodes.unwrap_or(tf.config.initial_nodes), &tf.lines)
}

/// Initial node count announced by a trace header.
///
/// Only comments before the first instruction are considered; later
/// `numNodes = N` lines are range recomputes.
pub fn header_initial_nodes<I>(lines: I) -> Result<Option<NodeId>>
where
    I: IntoIterator<Item = Result<(usize, TraceLine)>>,
{
    for item in lines {
        let (line_no, line) = item?;
        match line {
            TraceLine::Instruction(_) => break,
            TraceLine::Comment(text) => {
                if let Some(n) = text.strip_prefix("numNodes = ") {
                    let n = n
                        .trim()
                        .parse::<NodeId>()
                        .with_context(|| format!("bad numNodes header at line {line_no}"))?;
                    return Ok(Some(n));
                }
            }
        }
    }
    Ok(None)
}

/// Replay a trace file in any encoding.
///
/// `nodes` overrides the node count recorded in the trace itself.
pub fn replay_file<P: AsRef<Path>>(path: P, nodes: Option<NodeId>) -> Result<ReplayReport> {
    let path = path.as_ref();
    match TraceEncoding::from_path(path) {
        TraceEncoding::Text => {
            let nodes = match nodes {
                Some(n) => n,
                None => header_initial_nodes(stream_trace_text(path)?)?.with_context(|| {
                    format!(
                        "{} has no `# numNodes = N` header; pass the initial node count",
                        path.display()
                    )
                })?,
            };
            info!(trace=%path.display(), nodes, "replaying text trace");
            replay_numbered(nodes, stream_trace_text(path).context("open trace stream")?)
        }
        enc @ (TraceEncoding::Json | TraceEncoding::Cbor) => {
            let tf = if enc == TraceEncoding::Json {
                read_trace_json(path)?
            } else {
                read_trace_cbor(path)?
            };
            info!(
                trace=%path.display(),
                nodes = nodes.unwrap_or(tf.config.initial_nodes),
                lines = tf.len(),
                "replaying trace envelope"
            );
            replay_envelope(&tf, nodes)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<TraceLine> {
        text.lines().map(|l| l.parse().unwrap()).collect()
    }

    #[test]
    fn accepts_wired_chain() {
        let lines = parse(
            "# header\n\
             DoProducerNode (3) -> 1\n\
             DoTransmuterNode 3 -> (1) -> 0\n\
             DoConsumerNode 1 -> (0)",
        );
        let report = replay_lines(4, &lines).unwrap();
        assert_eq!(report.chains, 1);
        assert_eq!(report.instructions, 3);
        assert_eq!(report.comments, 1);
    }

    #[test]
    fn rejects_broken_hop() {
        let lines = parse(
            "DoProducerNode (3) -> 1\n\
             DoTransmuterNode 3 -> (2) -> 0",
        );
        let err = replay_lines(4, &lines).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
    }

    #[test]
    fn rejects_unterminated_chain() {
        let lines = parse("DoProducerNode (0) -> 1");
        assert!(replay_lines(4, &lines).is_err());
    }

    #[test]
    fn rejects_delete_inside_chain() {
        let lines = parse(
            "DoProducerNode (0) -> 1\n\
             DoDeleteNode 2",
        );
        assert!(replay_lines(4, &lines).is_err());
    }

    #[test]
    fn create_must_recycle_smallest() {
        let ok = parse(
            "DoDeleteNode 1\n\
             DoDeleteNode 0\n\
             DoCreateNode 0 2",
        );
        let report = replay_lines(4, &ok).unwrap();
        assert_eq!(report.nodes_deleted, 2);
        assert_eq!(report.nodes_created, 1);

        let bad = parse(
            "DoDeleteNode 1\n\
             DoDeleteNode 0\n\
             DoCreateNode 1 2",
        );
        assert!(replay_lines(4, &bad).is_err());
    }

    #[test]
    fn rejects_chain_through_deleted_node() {
        let lines = parse(
            "DoDeleteNode 1\n\
             DoProducerNode (0) -> 1\n\
             DoConsumerNode 0 -> (1)",
        );
        assert!(replay_lines(4, &lines).is_err());
    }

    #[test]
    fn rejects_deleting_last_node() {
        let lines = parse("DoDeleteNode 0");
        assert!(replay_lines(1, &lines).is_err());
    }

    #[test]
    fn compaction_shrinks_arena() {
        let lines = parse(
            "DoDeleteNode 2\n\
             DoDeleteNode 3",
        );
        let report = replay_lines(4, &lines).unwrap();
        assert_eq!(report.final_nodes, 2);
        assert_eq!(report.max_live_nodes, 4);
    }

    #[test]
    fn header_names_initial_nodes() {
        let text = "# lfsr of order 3, with range 1-7\n\
                    # numNodes = 4\n\
                    DoCreateNode 4 0\n\
                    # numNodes = 6\n";
        let lines = crate::io::TraceLineIter::new(text.as_bytes());
        assert_eq!(header_initial_nodes(lines).unwrap(), Some(4));

        let headless = crate::io::TraceLineIter::new("DoDeleteNode 1\n# numNodes = 9\n".as_bytes());
        assert_eq!(header_initial_nodes(headless).unwrap(), None);
    }
}
