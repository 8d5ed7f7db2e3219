//! JSON output formatting
//!
//! Writes a single report document per run: when and where it ran, the
//! effective configuration, and per-stream results with exporter statistics.

use crate::config::{PacingMode, RunConfig, StreamKind};
use crate::coordinator::{RunReport, StreamReport};
use crate::stats::histogram::LatencyHistogram;
use crate::stats::ExportSnapshot;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Export request latency percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLatency {
    pub min: JsonDuration,
    pub max: JsonDuration,
    pub mean: JsonDuration,
    pub p50: JsonDuration,
    pub p90: JsonDuration,
    pub p99: JsonDuration,
}

impl JsonLatency {
    /// None when no request was recorded
    pub fn from_histogram(hist: &LatencyHistogram) -> Option<Self> {
        Some(Self {
            min: JsonDuration::from_duration(hist.min()?),
            max: JsonDuration::from_duration(hist.max()?),
            mean: JsonDuration::from_duration(hist.mean()?),
            p50: JsonDuration::from_duration(hist.percentile(50.0)?),
            p90: JsonDuration::from_duration(hist.percentile(90.0)?),
            p99: JsonDuration::from_duration(hist.percentile(99.0)?),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonExportStats {
    pub queued: u64,
    pub dropped: u64,
    pub exported: u64,
    pub failed_events: u64,
    pub requests: u64,
    pub failed_requests: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<JsonLatency>,
}

impl From<&ExportSnapshot> for JsonExportStats {
    fn from(snapshot: &ExportSnapshot) -> Self {
        Self {
            queued: snapshot.queued,
            dropped: snapshot.dropped,
            exported: snapshot.exported,
            failed_events: snapshot.failed_events,
            requests: snapshot.requests,
            failed_requests: snapshot.failed_requests,
            latency: JsonLatency::from_histogram(&snapshot.latency),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonStream {
    pub kind: StreamKind,
    pub endpoint: String,
    pub events_emitted: u64,
    pub batches_completed: u64,
    pub elapsed: JsonDuration,
    pub events_per_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<JsonExportStats>,
}

impl JsonStream {
    fn new(stream: &StreamReport, config: &RunConfig) -> Self {
        let result = &stream.result;
        Self {
            kind: result.kind,
            endpoint: config.endpoint_for(result.kind).to_string(),
            events_emitted: result.events_emitted,
            batches_completed: result.batches_completed,
            elapsed: JsonDuration::from_duration(result.elapsed),
            events_per_second: result.events_per_second(),
            failure: result.failure.clone(),
            export: stream.export.as_ref().map(JsonExportStats::from),
        }
    }
}

/// Effective run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunConfig {
    pub events_per_batch: u32,
    pub delay_between_events: JsonDuration,
    pub delay_between_batches: JsonDuration,
    pub iterations: u32,
    pub wait_for_minute_boundary: bool,
    pub streams: Vec<StreamKind>,
    pub drain_delay: JsonDuration,
    pub pacing: PacingMode,
}

impl From<&RunConfig> for JsonRunConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            events_per_batch: config.events_per_batch,
            delay_between_events: JsonDuration::from_duration(config.delay_between_events),
            delay_between_batches: JsonDuration::from_duration(config.delay_between_batches),
            iterations: config.iterations,
            wait_for_minute_boundary: config.wait_for_minute_boundary,
            streams: config.stream_selection.kinds(),
            drain_delay: JsonDuration::from_duration(config.drain_delay),
            pacing: config.pacing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTestInfo {
    pub tool: String,
    pub version: String,
    pub hostname: String,
    pub finished_at: String,
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub test_info: JsonTestInfo,
    pub config: JsonRunConfig,
    pub elapsed: JsonDuration,
    pub total_events: u64,
    pub streams: Vec<JsonStream>,
}

pub fn build_report(report: &RunReport, config: &RunConfig) -> JsonReport {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());

    JsonReport {
        test_info: JsonTestInfo {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
            finished_at: chrono::Utc::now().to_rfc3339(),
        },
        config: JsonRunConfig::from(config),
        elapsed: JsonDuration::from_duration(report.elapsed),
        total_events: report.total_events(),
        streams: report
            .streams()
            .map(|stream| JsonStream::new(stream, config))
            .collect(),
    }
}

/// Write JSON output to file
pub fn write_json_output(output_path: &Path, report: &JsonReport, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;

    if pretty {
        serde_json::to_writer_pretty(file, report)?;
    } else {
        serde_json::to_writer(file, report)?;
    }

    Ok(())
}

/// Format duration in human-readable format
fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else if micros < 3_600_000_000 {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    } else {
        format!("{:.2}h", micros as f64 / 3_600_000_000.0)
    }
}
