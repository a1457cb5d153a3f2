// crates/rigen-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rigen_core::{GeneratorConfig, Lfsr, LfsrWord, NodeId};
use rigen_trace::{
    format::TraceFile,
    generator::Generator,
    io::{write_summary_auto, write_trace_auto, TextSink, TraceEncoding},
    replay::replay_file,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "rigen",
    about = "Random instruction trace generator",
    long_about = "Random instruction trace generator.\n\nEmits a deterministic create/delete/chain workload for dynamic dataflow node graphs, and checks that existing traces are executable.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate a trace. Text goes to stdout unless --out is given;
    /// `.json` / `.cbor` outputs write the full envelope instead.
    Generate {
        /// TOML profile with generator parameters (flags below override it)
        #[arg(long)]
        profile: Option<PathBuf>,

        /// LFSR feedback polynomial (decimal or 0x-hex, non-zero)
        #[arg(long, value_parser = parse_word)]
        feed: Option<LfsrWord>,

        /// Initial LFSR register (decimal or 0x-hex)
        #[arg(long, value_parser = parse_word)]
        seed: Option<LfsrWord>,

        /// Probability of a create draw, in [0, 1]
        #[arg(long)]
        create_prob: Option<f64>,

        /// Probability of a delete draw, in [0, 1]
        #[arg(long)]
        delete_prob: Option<f64>,

        /// Nodes alive at start (>0)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        nodes: Option<NodeId>,

        /// Number of iterations
        #[arg(long)]
        length: Option<u64>,

        /// Output path (text, .json, or .cbor)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write the run summary (.json or .cbor)
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },

    /// Replay a trace (text, .json, or .cbor) and check it is executable
    Replay {
        /// Input trace path
        #[arg(long)]
        trace: PathBuf,

        /// Nodes alive at start of the trace (>0); defaults to the count the
        /// trace records (envelope config or `# numNodes = N` header)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        nodes: Option<NodeId>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the first draws of an LFSR
    Lfsr {
        /// Feedback polynomial (decimal or 0x-hex, non-zero)
        #[arg(long, default_value = "0xF82F", value_parser = parse_word)]
        feed: LfsrWord,

        /// Initial register (decimal or 0x-hex)
        #[arg(long, default_value = "1", value_parser = parse_word)]
        seed: LfsrWord,

        /// Number of draws to print
        #[arg(long, default_value_t = 16)]
        count: u64,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Generate {
            profile,
            feed,
            seed,
            create_prob,
            delete_prob,
            nodes,
            length,
            out,
            summary_out,
        } => {
            let mut cfg = load_profile(profile.as_deref())?;
            if let Some(v) = feed {
                cfg.feed = v;
            }
            if let Some(v) = seed {
                cfg.seed = v;
            }
            if let Some(v) = create_prob {
                cfg.create_prob = v;
            }
            if let Some(v) = delete_prob {
                cfg.delete_prob = v;
            }
            if let Some(v) = nodes {
                cfg.initial_nodes = v;
            }
            if let Some(v) = length {
                cfg.sequence_length = v;
            }
            generate(cfg, out, summary_out)
        }

        Cmd::Replay { trace, nodes, json } => replay(trace, nodes, json),

        Cmd::Lfsr { feed, seed, count } => lfsr(feed, seed, count),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
///
/// Logs go to stderr so the trace on stdout stays clean.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Parse a register-sized integer, accepting `0x` hex.
fn parse_word(s: &str) -> Result<LfsrWord, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => LfsrWord::from_str_radix(hex, 16),
        None => s.parse::<LfsrWord>(),
    };
    parsed.map_err(|e| format!("invalid integer `{s}`: {e}"))
}

/// Defaults, overlaid with a TOML profile if one is given.
fn load_profile(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("read profile {}", path.display()))?;
    let cfg: GeneratorConfig =
        toml::from_str(&src).with_context(|| format!("parse profile {}", path.display()))?;
    info!(profile=%path.display(), "loaded generator profile");
    Ok(cfg)
}

/// Ensure the parent directory for a file exists.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

fn generate(cfg: GeneratorConfig, out: Option<PathBuf>, summary_out: Option<PathBuf>) -> Result<()> {
    cfg.validate().context("invalid generator parameters")?;
    let mut generator = Generator::new(cfg)?;

    let summary = match &out {
        None => {
            let stdout = std::io::stdout();
            let mut sink = TextSink::new(BufWriter::new(stdout.lock()));
            let res = generator.run(&mut sink);
            // Flush whatever was emitted, including a fatal diagnostic.
            sink.into_inner()?;
            res.context("trace generation failed")?
        }
        Some(path) => {
            ensure_parent_dir(path)?;
            match TraceEncoding::from_path(path) {
                TraceEncoding::Text => {
                    let f = File::create(path)
                        .with_context(|| format!("create {}", path.display()))?;
                    let mut sink = TextSink::new(BufWriter::new(f));
                    let res = generator.run(&mut sink);
                    sink.into_inner()?;
                    res.context("trace generation failed")?
                }
                TraceEncoding::Json | TraceEncoding::Cbor => {
                    let mut lines = Vec::new();
                    let summary = generator.run(&mut lines).context("trace generation failed")?;
                    let tf = TraceFile::new(*generator.config(), lines, summary.clone());
                    write_trace_auto(path, &tf)
                        .with_context(|| format!("writing trace to {}", path.display()))?;
                    summary
                }
            }
        }
    };

    if let Some(path) = &summary_out {
        ensure_parent_dir(path)?;
        write_summary_auto(path, &summary)
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }

    if let Some(path) = &out {
        eprintln!(
            "Generated {} iterations → {} chains, {} created, {} deleted → {}",
            summary.iterations,
            summary.statistics.num_chains,
            summary.statistics.num_nodes_created,
            summary.statistics.num_nodes_deleted,
            path.display()
        );
    }
    Ok(())
}

fn replay(trace: PathBuf, nodes: Option<NodeId>, json: bool) -> Result<()> {
    let report =
        replay_file(&trace, nodes).with_context(|| format!("replaying {}", trace.display()))?;

    if json {
        let s = serde_json::to_string_pretty(&report).context("serialize replay report")?;
        println!("{s}");
    } else {
        println!(
            "OK: {} instructions, {} chains, {} created, {} deleted, final numNodes {}, peak live {}",
            report.instructions,
            report.chains,
            report.nodes_created,
            report.nodes_deleted,
            report.final_nodes,
            report.max_live_nodes
        );
    }
    Ok(())
}

fn lfsr(feed: LfsrWord, seed: LfsrWord, count: u64) -> Result<()> {
    let mut l = Lfsr::new(feed, seed)?;
    let stdout = std::io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    writeln!(w, "# lfsr of order {}, with range 1-{}", l.order(), l.max_val())?;
    for _ in 0..count {
        writeln!(w, "{}", l.next_value())?;
    }
    w.flush()?;
    Ok(())
}
