//! Driver, trace envelope, and replay checking for random instruction traces.
//!
//! This crate threads the `rigen-core` model into a runnable pipeline:
//!
//! - `generator`: the deterministic driver loop (`Generator`) and the
//!   `TraceSink` it writes to.
//! - `format`: a small, versioned trace envelope (`TraceFile`).
//! - `io`: text / JSON / CBOR read-write helpers with extension auto-detection.
//! - `replay`: a checker that replays a trace against a liveness model, the
//!   way the dataflow runtime under test would consume it.
//!
//! We intentionally avoid broad re-exports so callers use stable paths like
//! `rigen_trace::generator::Generator`.

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

/// Versioned trace envelope.
pub mod format;
/// Deterministic driver loop and trace sinks.
pub mod generator;
/// Text/JSON/CBOR I/O helpers.
pub mod io;
/// Replay a trace against a node liveness model.
pub mod replay;
