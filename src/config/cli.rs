//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// otelpulse - Synthetic OTLP log and trace load generator
///
/// Numeric options are parsed leniently: a missing, non-numeric or
/// non-positive value falls back to its default instead of failing.
#[derive(Parser, Debug)]
#[command(name = "otelpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Pacing Options ===
    /// Number of events to generate per batch (default: 10)
    #[arg(short = 'r', long, alias = "eventsperbatch", allow_hyphen_values = true)]
    pub events_per_batch: Option<String>,

    /// Delay between each event in a batch, in milliseconds (default: 0)
    #[arg(short = 'd', long, alias = "delaybetweenevents", allow_hyphen_values = true)]
    pub delay_between_events: Option<String>,

    /// Delay between each batch, in milliseconds (default: 1000)
    #[arg(short = 'b', long, alias = "delaybetweenbatches", allow_hyphen_values = true)]
    pub delay_between_batches: Option<String>,

    /// Number of batches to generate per stream (default: 1)
    #[arg(short = 'i', long, allow_hyphen_values = true)]
    pub iterations: Option<String>,

    /// Wait for the start of a minute before producing events
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Collector endpoint with port, e.g. http://localhost:4318
    ///
    /// Two endpoints separated by ';' send logs to the first and traces to
    /// the second.
    #[arg(short = 'e', long)]
    pub endpoint: Option<String>,

    /// Streams to publish: 1 -> only logs, 2 -> only traces, 3 -> logs and traces (default)
    #[arg(short = 'p', long, alias = "publishlogandtrace", allow_hyphen_values = true)]
    pub publish_log_and_trace: Option<String>,

    /// Wait after the log stream completes so queued exports can flush, in milliseconds (default: 10000)
    #[arg(long, allow_hyphen_values = true)]
    pub drain_delay_ms: Option<String>,

    /// Pacing strategy between events and batches
    #[arg(long, value_enum)]
    pub pacing: Option<PacingArg>,

    // === Exporter Options ===
    /// Maximum number of events buffered per stream before dropping
    #[arg(long)]
    pub max_queue_size: Option<usize>,

    /// Maximum number of events per export request
    #[arg(long)]
    pub max_export_batch_size: Option<usize>,

    /// Maximum delay before queued events are exported, in milliseconds
    #[arg(long)]
    pub scheduled_delay_ms: Option<u64>,

    /// Timeout of a single export request, in milliseconds
    #[arg(long)]
    pub export_timeout_ms: Option<u64>,

    // === Output Options ===
    /// JSON report output file path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Log filter (e.g. info, debug, otelpulse=trace); overrides RUST_LOG (default: info)
    #[arg(long, env = "OTELPULSE_LOG")]
    pub log_level: Option<String>,

    // === Configuration File ===
    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Dry run - resolve and print the configuration without emitting events
    #[arg(long)]
    pub dry_run: bool,
}

/// Pacing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PacingArg {
    /// Spin for waits up to 16ms, sleep for longer ones
    Adaptive,
    /// Sleep (yield CPU)
    Sleep,
    /// Spin (busy-wait)
    Spin,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
