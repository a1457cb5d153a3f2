//! rigen-core: the model behind the random instruction trace generator.
//!
//! This crate owns every piece of state that decides *what* the trace says:
//! - the Fibonacci LFSR that supplies the deterministic opcode stream,
//! - the range partition that turns a draw into an opcode,
//! - the node registry (allocation, recycling, tail compaction),
//! - the chain state machine and its producer/transmuter/consumer wiring,
//! - the chain history with the backward-growing overlap estimator, and
//! - the running statistics and the generator configuration.
//!
//! Nothing here performs I/O; the driver in `rigen-trace` threads these
//! pieces together and writes the resulting [`TraceLine`]s to a sink.
//!
//! ```
//! use rigen_core::prelude::*;
//!
//! let mut lfsr = Lfsr::new(7, 1)?;
//! assert_eq!(lfsr.max_val(), 7);
//! assert_eq!(lfsr.next_value(), 7);
//! # Ok::<(), anyhow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Chain accumulation and wiring emission.
pub mod chain;
/// Generator parameters with defaults and validation.
pub mod config;
/// Fibonacci linear-feedback shift register.
pub mod lfsr;
/// Chain history and the trailing-window overlap estimator.
pub mod overlap;
/// Probability-range partition and opcode classification.
pub mod ranges;
/// Node identifier lifecycle (allocation, tombstones, compaction).
pub mod registry;
/// Running counters and the end-of-run summary.
pub mod stats;
/// Instruction and trace-line types with their text encoding.
pub mod types;

// ---- Re-exports for workspace compatibility ----
pub use chain::*;
pub use config::*;
pub use lfsr::*;
pub use overlap::*;
pub use ranges::*;
pub use registry::*;
pub use stats::*;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use rigen_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        chain::{ChainBuilder, ChainEvent, Closure},
        config::GeneratorConfig,
        lfsr::Lfsr,
        overlap::ChainHistory,
        ranges::{OpClass, Ranges},
        registry::{Allocation, DeleteOutcome, NodeRegistry},
        stats::{Statistics, Summary},
        types::*,
    };
}
