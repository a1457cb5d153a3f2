// crates/rigen-trace/src/format.rs

//! Versioned trace envelope for structured (JSON/CBOR) output.
//!
//! The plain-text trace is the runtime-facing format; the envelope bundles
//! the same lines with the configuration that produced them and the final
//! summary, so a run can be archived and replayed later.

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

use rigen_core::{GeneratorConfig, Instruction, Summary, TraceLine};
use serde::{Deserialize, Serialize};

/// Current envelope version.
pub const TRACE_VERSION: u16 = 1;

/// Trace envelope.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraceFile {
    /// Format/version tag for forward-compat.
    pub version: u16,
    /// Parameters the trace was generated from.
    pub config: GeneratorConfig,
    /// Trace lines in emission order.
    pub lines: Vec<TraceLine>,
    /// End-of-run summary, if the run completed.
    pub summary: Option<Summary>,
}

impl TraceFile {
    /// Wrap a finished run.
    #[must_use]
    pub fn new(config: GeneratorConfig, lines: Vec<TraceLine>, summary: Summary) -> Self {
        Self {
            version: TRACE_VERSION,
            config,
            lines,
            summary: Some(summary),
        }
    }

    /// Number of lines.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the trace is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Instruction lines only, in order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.lines.iter().filter_map(TraceLine::as_instruction)
    }
}
