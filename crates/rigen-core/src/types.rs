//! Instruction and trace-line types shared across the workspace.
//!
//! The text forms are the wire format consumed by the dataflow runtime under
//! test, so `Display` and `FromStr` must stay exact inverses of each other:
//!
//! ```text
//! DoCreateNode <newId> <responsibleId>
//! DoDeleteNode <id>
//! DoProducerNode (<id>) -> <dstId>
//! DoTransmuterNode <srcId> -> (<id>) -> <dstId>
//! DoConsumerNode <srcId> -> (<id>)
//! ```
//!
//! Any line starting with `#` is a diagnostic comment.

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node identifier, addressed `0..numNodes-1`.
pub type NodeId = u32;

/// One wiring or lifecycle instruction for the runtime under test.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Create node `id`; `responsible` is the live node that issues the creation.
    CreateNode {
        /// Newly created (or recycled) identifier.
        id: NodeId,
        /// Lowest live identifier at creation time.
        responsible: NodeId,
    },
    /// Tear down node `id`.
    DeleteNode {
        /// Identifier being tombstoned.
        id: NodeId,
    },
    /// Head of a chain: `id` produces into `dst`.
    Producer {
        /// Producing node.
        id: NodeId,
        /// First downstream node.
        dst: NodeId,
    },
    /// Interior of a chain: `src -> id -> dst`.
    Transmuter {
        /// Upstream node.
        src: NodeId,
        /// Transmuting node.
        id: NodeId,
        /// Downstream node.
        dst: NodeId,
    },
    /// Tail of a chain: `src` feeds `id`.
    Consumer {
        /// Upstream node.
        src: NodeId,
        /// Consuming node.
        id: NodeId,
    },
}

impl Instruction {
    /// Every node id this instruction references, in text order.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeId> {
        match *self {
            Self::CreateNode { id, responsible } => vec![id, responsible],
            Self::DeleteNode { id } => vec![id],
            Self::Producer { id, dst } => vec![id, dst],
            Self::Transmuter { src, id, dst } => vec![src, id, dst],
            Self::Consumer { src, id } => vec![src, id],
        }
    }

    /// Whether this instruction is part of chain wiring (not create/delete).
    #[inline]
    #[must_use]
    pub const fn is_wiring(&self) -> bool {
        matches!(
            self,
            Self::Producer { .. } | Self::Transmuter { .. } | Self::Consumer { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::CreateNode { id, responsible } => write!(f, "DoCreateNode {id} {responsible}"),
            Self::DeleteNode { id } => write!(f, "DoDeleteNode {id}"),
            Self::Producer { id, dst } => write!(f, "DoProducerNode ({id}) -> {dst}"),
            Self::Transmuter { src, id, dst } => {
                write!(f, "DoTransmuterNode {src} -> ({id}) -> {dst}")
            }
            Self::Consumer { src, id } => write!(f, "DoConsumerNode {src} -> ({id})"),
        }
    }
}

impl FromStr for Instruction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let toks: Vec<&str> = s.split_whitespace().collect();
        let (&opcode, args) = toks.split_first().ok_or_else(|| anyhow!("empty instruction"))?;

        match opcode {
            "DoCreateNode" => {
                ensure!(args.len() == 2, "DoCreateNode expects 2 arguments, got {}", args.len());
                Ok(Self::CreateNode {
                    id: plain_id(args[0])?,
                    responsible: plain_id(args[1])?,
                })
            }
            "DoDeleteNode" => {
                ensure!(args.len() == 1, "DoDeleteNode expects 1 argument, got {}", args.len());
                Ok(Self::DeleteNode { id: plain_id(args[0])? })
            }
            "DoProducerNode" => match args {
                [id, "->", dst] => Ok(Self::Producer {
                    id: paren_id(id)?,
                    dst: plain_id(dst)?,
                }),
                _ => bail!("malformed DoProducerNode, expected `(<id>) -> <dst>`"),
            },
            "DoTransmuterNode" => match args {
                [src, "->", id, "->", dst] => Ok(Self::Transmuter {
                    src: plain_id(src)?,
                    id: paren_id(id)?,
                    dst: plain_id(dst)?,
                }),
                _ => bail!("malformed DoTransmuterNode, expected `<src> -> (<id>) -> <dst>`"),
            },
            "DoConsumerNode" => match args {
                [src, "->", id] => Ok(Self::Consumer {
                    src: plain_id(src)?,
                    id: paren_id(id)?,
                }),
                _ => bail!("malformed DoConsumerNode, expected `<src> -> (<id>)`"),
            },
            other => bail!("unknown instruction `{other}`"),
        }
    }
}

fn plain_id(tok: &str) -> Result<NodeId> {
    tok.parse::<NodeId>()
        .with_context(|| format!("invalid node id `{tok}`"))
}

fn paren_id(tok: &str) -> Result<NodeId> {
    let inner = tok
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| anyhow!("expected parenthesized node id, got `{tok}`"))?;
    plain_id(inner)
}

/// One line of the emitted trace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceLine {
    /// Diagnostic / statistics text (rendered with a leading `# `).
    Comment(String),
    /// A runtime instruction.
    Instruction(Instruction),
}

impl TraceLine {
    /// Build a comment line.
    #[inline]
    pub fn comment(text: impl Into<String>) -> Self {
        Self::Comment(text.into())
    }

    /// The instruction carried by this line, if any.
    #[inline]
    #[must_use]
    pub const fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Self::Instruction(i) => Some(i),
            Self::Comment(_) => None,
        }
    }
}

impl From<Instruction> for TraceLine {
    #[inline]
    fn from(i: Instruction) -> Self {
        Self::Instruction(i)
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comment(text) if text.is_empty() => f.write_str("#"),
            Self::Comment(text) => write!(f, "# {text}"),
            Self::Instruction(i) => fmt::Display::fmt(i, f),
        }
    }
}

impl FromStr for TraceLine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim_end_matches(['\r', '\n']);
        if let Some(rest) = s.strip_prefix('#') {
            let text = rest.strip_prefix(' ').unwrap_or(rest);
            return Ok(Self::Comment(text.to_owned()));
        }
        s.parse().map(Self::Instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_runtime_format() {
        let cases = [
            (Instruction::CreateNode { id: 100, responsible: 0 }, "DoCreateNode 100 0"),
            (Instruction::DeleteNode { id: 7 }, "DoDeleteNode 7"),
            (Instruction::Producer { id: 3, dst: 1 }, "DoProducerNode (3) -> 1"),
            (
                Instruction::Transmuter { src: 3, id: 1, dst: 0 },
                "DoTransmuterNode 3 -> (1) -> 0",
            ),
            (Instruction::Consumer { src: 1, id: 0 }, "DoConsumerNode 1 -> (0)"),
        ];
        for (ins, text) in cases {
            assert_eq!(ins.to_string(), text);
            assert_eq!(text.parse::<Instruction>().unwrap(), ins);
        }
    }

    #[test]
    fn parse_tolerates_extra_whitespace() {
        let ins: Instruction = "DoTransmuterNode   4 ->  (5)   -> 6 ".parse().unwrap();
        assert_eq!(ins, Instruction::Transmuter { src: 4, id: 5, dst: 6 });
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("DoProducerNode 3 -> 1".parse::<Instruction>().is_err());
        assert!("DoConsumerNode 1 -> 0".parse::<Instruction>().is_err());
        assert!("DoDeleteNode".parse::<Instruction>().is_err());
        assert!("DoCreateNode x 0".parse::<Instruction>().is_err());
        assert!("DoSomething 1".parse::<Instruction>().is_err());
        assert!("".parse::<Instruction>().is_err());
    }

    #[test]
    fn comment_lines_keep_their_text() {
        let line: TraceLine = "# numNodes = 100".parse().unwrap();
        assert_eq!(line, TraceLine::comment("numNodes = 100"));
        assert_eq!(line.to_string(), "# numNodes = 100");
        assert_eq!("#".parse::<TraceLine>().unwrap().to_string(), "#");
    }
}
