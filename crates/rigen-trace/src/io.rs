//! I/O helpers for traces and run summaries.
//!
//! Three encodings, auto-detected by extension (case-insensitive):
//! - `.json`: pretty JSON `TraceFile` envelope,
//! - `.cbor`: CBOR `TraceFile` envelope,
//! - anything else: the line-oriented text trace the runtime consumes.

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

use crate::format::TraceFile;
use crate::generator::TraceSink;
use anyhow::{anyhow, Context, Result};
use rigen_core::{Summary, TraceLine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/* ---------------- Text ---------------- */

/// Sink that renders each line as text, newline-terminated.
pub struct TextSink<W: Write> {
    out: W,
    lines: u64,
}

impl<W: Write> TextSink<W> {
    /// Wrap a writer (callers should buffer it).
    pub const fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// Lines written so far.
    #[must_use]
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// Flush and return the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush().context("flush text trace")?;
        Ok(self.out)
    }
}

impl<W: Write> TraceSink for TextSink<W> {
    fn emit(&mut self, line: TraceLine) -> Result<()> {
        writeln!(self.out, "{line}").context("write trace line")?;
        self.lines += 1;
        Ok(())
    }
}

/// Owning iterator over text trace lines.
///
/// Yields `Err` with the 1-based line number when a line fails to parse.
pub struct TraceLineIter<R: BufRead> {
    rdr: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> TraceLineIter<R> {
    /// Parse lines from a buffered reader.
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            buf: String::with_capacity(256),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceLineIter<R> {
    type Item = Result<(usize, TraceLine)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.rdr.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let text = self.buf.trim_end_matches(['\r', '\n']);
                    if text.trim().is_empty() {
                        // Blank lines carry nothing for the runtime.
                        continue;
                    }
                    let line_no = self.line_no;
                    return Some(
                        text.parse::<TraceLine>()
                            .map(|l| (line_no, l))
                            .with_context(|| format!("parse trace line {line_no}")),
                    );
                }
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("read trace line {}", self.line_no + 1)),
                    )
                }
            }
        }
    }
}

/// Open a text trace for streaming.
pub fn stream_trace_text<P: AsRef<Path>>(path: P) -> Result<TraceLineIter<BufReader<File>>> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    Ok(TraceLineIter::new(BufReader::new(f)))
}

/// Read a whole text trace.
pub fn read_trace_text<P: AsRef<Path>>(path: P) -> Result<Vec<TraceLine>> {
    stream_trace_text(path)?
        .map(|item| item.map(|(_, line)| line))
        .collect()
}

/// Write lines as a text trace.
pub fn write_trace_text<P: AsRef<Path>>(path: P, lines: &[TraceLine]) -> Result<()> {
    let path_ref = path.as_ref();
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut sink = TextSink::new(BufWriter::new(f));
    for line in lines {
        sink.emit(line.clone())?;
    }
    sink.into_inner()?;
    Ok(())
}

/* ---------------- JSON / CBOR ---------------- */

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("deserialize JSON {what}"))
}

fn write_json<T: Serialize>(path: &Path, v: &T, what: &str) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| format!("serialize JSON {what}"))?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

fn read_cbor<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr).with_context(|| format!("deserialize CBOR {what}"))
}

fn write_cbor<T: Serialize>(path: &Path, v: &T, what: &str) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| format!("serialize CBOR {what}"))?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/// Read a `TraceFile` from **JSON**.
pub fn read_trace_json<P: AsRef<Path>>(path: P) -> Result<TraceFile> {
    read_json(path.as_ref(), "trace file")
}

/// Write a `TraceFile` to **JSON** (pretty).
pub fn write_trace_json<P: AsRef<Path>>(path: P, v: &TraceFile) -> Result<()> {
    write_json(path.as_ref(), v, "trace file")
}

/// Read a `TraceFile` from **CBOR**.
pub fn read_trace_cbor<P: AsRef<Path>>(path: P) -> Result<TraceFile> {
    read_cbor(path.as_ref(), "trace file")
}

/// Write a `TraceFile` to **CBOR**.
pub fn write_trace_cbor<P: AsRef<Path>>(path: P, v: &TraceFile) -> Result<()> {
    write_cbor(path.as_ref(), v, "trace file")
}

/* --------------- Auto-detect by extension --------------- */

/// Encoding picked from a path's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEncoding {
    /// Line-oriented text.
    Text,
    /// Pretty JSON envelope.
    Json,
    /// CBOR envelope.
    Cbor,
}

impl TraceEncoding {
    /// `.json` → JSON, `.cbor` → CBOR, anything else → text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match ext_lower(path).as_deref() {
            Some("json") => Self::Json,
            Some("cbor") => Self::Cbor,
            _ => Self::Text,
        }
    }
}

/// Read trace lines from any encoding.
pub fn read_lines_auto<P: AsRef<Path>>(path: P) -> Result<Vec<TraceLine>> {
    let path = path.as_ref();
    match TraceEncoding::from_path(path) {
        TraceEncoding::Text => read_trace_text(path),
        TraceEncoding::Json => Ok(read_trace_json(path)?.lines),
        TraceEncoding::Cbor => Ok(read_trace_cbor(path)?.lines),
    }
}

/// Write a finished run in the encoding implied by `path`.
pub fn write_trace_auto<P: AsRef<Path>>(path: P, v: &TraceFile) -> Result<()> {
    let path = path.as_ref();
    match TraceEncoding::from_path(path) {
        TraceEncoding::Text => write_trace_text(path, &v.lines),
        TraceEncoding::Json => write_trace_json(path, v),
        TraceEncoding::Cbor => write_trace_cbor(path, v),
    }
}

/// Write a run summary as JSON or CBOR.
pub fn write_summary_auto<P: AsRef<Path>>(path: P, v: &Summary) -> Result<()> {
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("json") => write_json(path, v, "summary"),
        Some("cbor") => write_cbor(path, v, "summary"),
        Some(other) => Err(anyhow!(
            "unsupported summary extension: {other} (supported: .json, .cbor)"
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Read a run summary written by [`write_summary_auto`].
pub fn read_summary_auto<P: AsRef<Path>>(path: P) -> Result<Summary> {
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("json") => read_json(path, "summary"),
        Some("cbor") => read_cbor(path, "summary"),
        Some(other) => Err(anyhow!(
            "unsupported summary extension: {other} (supported: .json, .cbor)"
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/* ---------------- Small helpers ---------------- */

#[inline]
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
