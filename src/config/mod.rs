//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, resolution of raw
//! knobs into an immutable [`RunConfig`], and validation.
//!
//! Raw numeric input never fails a run: anything missing, non-numeric or out
//! of range falls back to the default from the table below.
//!
//! | Knob | Default |
//! |---|---|
//! | events per batch | 10 |
//! | delay between events | 0 ms |
//! | delay between batches | 1000 ms |
//! | iterations | 1 |
//! | wait for minute boundary | false |
//! | endpoint | `http://localhost:4321` |
//! | publish log and trace | 3 (both) |

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_EVENTS_PER_BATCH: u32 = 10;
pub const DEFAULT_DELAY_BETWEEN_EVENTS: Duration = Duration::ZERO;
pub const DEFAULT_DELAY_BETWEEN_BATCHES: Duration = Duration::from_secs(1);
pub const DEFAULT_ITERATIONS: u32 = 1;
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4321";
pub const DEFAULT_DRAIN_DELAY: Duration = Duration::from_secs(10);

/// Separates the log endpoint from the trace endpoint in a combined value
pub const ENDPOINT_SEPARATOR: char = ';';

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000_000;
pub const DEFAULT_MAX_EXPORT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_SCHEDULED_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// One of the two independent telemetry streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Log,
    Trace,
}

impl StreamKind {
    /// Whether a failure inside this stream is logged and swallowed instead of
    /// propagated to the coordinator.
    ///
    /// Only the log stream does this; the trace stream fails the whole run.
    pub fn suppresses_errors(self) -> bool {
        matches!(self, StreamKind::Log)
    }

    /// Whether the stream waits for the drain delay after a normal completion
    pub fn drains_on_completion(self) -> bool {
        matches!(self, StreamKind::Log)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Log => write!(f, "log"),
            StreamKind::Trace => write!(f, "trace"),
        }
    }
}

/// Which streams a run publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamSelection {
    LogsOnly,
    TracesOnly,
    Both,
}

impl StreamSelection {
    /// Resolve the raw `publish-log-and-trace` value: 1 is logs only, 2 is
    /// traces only, anything else (including absent) is both.
    pub fn from_raw(raw: Option<i64>) -> Self {
        match raw {
            Some(1) => StreamSelection::LogsOnly,
            Some(2) => StreamSelection::TracesOnly,
            _ => StreamSelection::Both,
        }
    }

    pub fn includes(self, kind: StreamKind) -> bool {
        match self {
            StreamSelection::LogsOnly => kind == StreamKind::Log,
            StreamSelection::TracesOnly => kind == StreamKind::Trace,
            StreamSelection::Both => true,
        }
    }

    /// Selected stream kinds, log first
    pub fn kinds(self) -> Vec<StreamKind> {
        [StreamKind::Log, StreamKind::Trace]
            .into_iter()
            .filter(|kind| self.includes(*kind))
            .collect()
    }
}

impl Default for StreamSelection {
    fn default() -> Self {
        Self::Both
    }
}

impl fmt::Display for StreamSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSelection::LogsOnly => write!(f, "logs only"),
            StreamSelection::TracesOnly => write!(f, "traces only"),
            StreamSelection::Both => write!(f, "logs and traces"),
        }
    }
}

/// Pacing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    /// Spin for short waits, sleep for long ones
    Adaptive,
    /// Always sleep (yield to the scheduler)
    Sleep,
    /// Always spin (busy-wait)
    Spin,
}

impl Default for PacingMode {
    fn default() -> Self {
        Self::Adaptive
    }
}

impl fmt::Display for PacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacingMode::Adaptive => write!(f, "adaptive"),
            PacingMode::Sleep => write!(f, "sleep"),
            PacingMode::Spin => write!(f, "spin"),
        }
    }
}

/// Batch export processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterSettings {
    /// Events buffered before new ones are dropped
    pub max_queue_size: usize,
    /// Events per export request
    pub max_export_batch_size: usize,
    /// Maximum time an event waits in the queue before an export
    pub scheduled_delay: Duration,
    /// Timeout for a single export request
    pub export_timeout: Duration,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_export_batch_size: DEFAULT_MAX_EXPORT_BATCH_SIZE,
            scheduled_delay: DEFAULT_SCHEDULED_DELAY,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }
}

/// Raw, unresolved run knobs as they arrive from the CLI or a config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRunInput {
    pub events_per_batch: Option<i64>,
    pub delay_between_events_ms: Option<i64>,
    pub delay_between_batches_ms: Option<i64>,
    pub iterations: Option<i64>,
    pub wait: Option<bool>,
    pub endpoint: Option<String>,
    pub publish_log_and_trace: Option<i64>,
    pub drain_delay_ms: Option<i64>,
    pub pacing: Option<PacingMode>,
}

/// Raw exporter knobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawExporterInput {
    pub max_queue_size: Option<usize>,
    pub max_export_batch_size: Option<usize>,
    pub scheduled_delay_ms: Option<u64>,
    pub export_timeout_ms: Option<u64>,
}

/// Resolved run configuration
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// stream driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub events_per_batch: u32,
    pub delay_between_events: Duration,
    pub delay_between_batches: Duration,
    pub iterations: u32,
    pub wait_for_minute_boundary: bool,
    pub stream_selection: StreamSelection,
    pub log_endpoint: String,
    pub trace_endpoint: String,
    pub drain_delay: Duration,
    pub pacing: PacingMode,
    pub exporter: ExporterSettings,
}

impl RunConfig {
    /// Resolve raw input into an effective configuration
    pub fn resolve(raw: &RawRunInput, exporter: &RawExporterInput) -> Self {
        let (log_endpoint, trace_endpoint) = resolve_endpoints(raw.endpoint.as_deref());

        Self {
            events_per_batch: resolve_count(raw.events_per_batch, DEFAULT_EVENTS_PER_BATCH),
            delay_between_events: resolve_delay(
                raw.delay_between_events_ms,
                DEFAULT_DELAY_BETWEEN_EVENTS,
            ),
            delay_between_batches: resolve_delay(
                raw.delay_between_batches_ms,
                DEFAULT_DELAY_BETWEEN_BATCHES,
            ),
            iterations: resolve_count(raw.iterations, DEFAULT_ITERATIONS),
            wait_for_minute_boundary: raw.wait.unwrap_or(false),
            stream_selection: StreamSelection::from_raw(raw.publish_log_and_trace),
            log_endpoint,
            trace_endpoint,
            drain_delay: resolve_drain_delay(raw.drain_delay_ms),
            pacing: raw.pacing.unwrap_or_default(),
            exporter: ExporterSettings::resolve(exporter),
        }
    }

    /// Endpoint the given stream exports to
    pub fn endpoint_for(&self, kind: StreamKind) -> &str {
        match kind {
            StreamKind::Log => &self.log_endpoint,
            StreamKind::Trace => &self.trace_endpoint,
        }
    }

    /// Events a single stream emits when it runs to completion
    pub fn events_per_stream(&self) -> u64 {
        self.events_per_batch as u64 * self.iterations as u64
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::resolve(&RawRunInput::default(), &RawExporterInput::default())
    }
}

impl ExporterSettings {
    /// Absent values take the defaults; explicit zeros are kept so that the
    /// validator can reject them.
    pub fn resolve(raw: &RawExporterInput) -> Self {
        let defaults = Self::default();
        Self {
            max_queue_size: raw.max_queue_size.unwrap_or(defaults.max_queue_size),
            max_export_batch_size: raw
                .max_export_batch_size
                .unwrap_or(defaults.max_export_batch_size),
            scheduled_delay: raw
                .scheduled_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.scheduled_delay),
            export_timeout: raw
                .export_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.export_timeout),
        }
    }
}

/// Resolve a positive count, falling back on absent or non-positive input
pub fn resolve_count(raw: Option<i64>, default: u32) -> u32 {
    match raw {
        Some(value) if value > 0 => u32::try_from(value).unwrap_or(u32::MAX),
        _ => default,
    }
}

/// Resolve a millisecond delay, falling back on absent or non-positive input
pub fn resolve_delay(raw_ms: Option<i64>, default: Duration) -> Duration {
    match raw_ms {
        Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
        _ => default,
    }
}

/// Resolve the log drain delay; zero disables it, negative input falls back
pub fn resolve_drain_delay(raw_ms: Option<i64>) -> Duration {
    match raw_ms {
        Some(ms) if ms >= 0 => Duration::from_millis(ms as u64),
        _ => DEFAULT_DRAIN_DELAY,
    }
}

/// Resolve `(log_endpoint, trace_endpoint)` from a possibly combined value
///
/// `"http://a:1;http://b:2"` yields `("http://a:1", "http://b:2")`; any value
/// without a separator is shared by both streams.
pub fn resolve_endpoints(raw: Option<&str>) -> (String, String) {
    let endpoint = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return (DEFAULT_ENDPOINT.to_string(), DEFAULT_ENDPOINT.to_string()),
    };

    if endpoint.contains(ENDPOINT_SEPARATOR) {
        let mut parts = endpoint.split(ENDPOINT_SEPARATOR).map(str::trim);
        let log = parts.next().unwrap_or_default().to_string();
        let trace = parts.next().unwrap_or_default().to_string();
        (log, trace)
    } else {
        (endpoint.to_string(), endpoint.to_string())
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventsPerBatch: {} DelayBetweenEvents: {:?} DelayBetweenBatches: {:?} Iterations: {} Wait: {}",
            self.events_per_batch,
            self.delay_between_events,
            self.delay_between_batches,
            self.iterations,
            self.wait_for_minute_boundary
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let config = RunConfig::default();
        assert_eq!(config.events_per_batch, 10);
        assert_eq!(config.delay_between_events, Duration::ZERO);
        assert_eq!(config.delay_between_batches, Duration::from_secs(1));
        assert_eq!(config.iterations, 1);
        assert!(!config.wait_for_minute_boundary);
        assert_eq!(config.stream_selection, StreamSelection::Both);
        assert_eq!(config.log_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.trace_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.drain_delay, Duration::from_secs(10));
        assert_eq!(config.pacing, PacingMode::Adaptive);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let raw = RawRunInput {
            events_per_batch: Some(0),
            delay_between_events_ms: Some(-5),
            delay_between_batches_ms: Some(-1),
            iterations: Some(0),
            ..Default::default()
        };
        let config = RunConfig::resolve(&raw, &RawExporterInput::default());

        assert_eq!(config.events_per_batch, 10);
        assert_eq!(config.delay_between_events, Duration::ZERO);
        assert_eq!(config.delay_between_batches, Duration::from_secs(1));
        assert_eq!(config.iterations, 1);
    }

    #[test]
    fn test_valid_values_kept() {
        let raw = RawRunInput {
            events_per_batch: Some(2000),
            delay_between_events_ms: Some(5),
            delay_between_batches_ms: Some(250),
            iterations: Some(100),
            wait: Some(true),
            ..Default::default()
        };
        let config = RunConfig::resolve(&raw, &RawExporterInput::default());

        assert_eq!(config.events_per_batch, 2000);
        assert_eq!(config.delay_between_events, Duration::from_millis(5));
        assert_eq!(config.delay_between_batches, Duration::from_millis(250));
        assert_eq!(config.iterations, 100);
        assert!(config.wait_for_minute_boundary);
        assert_eq!(config.events_per_stream(), 200_000);
    }

    #[test]
    fn test_count_saturates() {
        assert_eq!(resolve_count(Some(i64::MAX), 10), u32::MAX);
    }

    #[test]
    fn test_split_endpoint() {
        let (log, trace) = resolve_endpoints(Some("http://a:1;http://b:2"));
        assert_eq!(log, "http://a:1");
        assert_eq!(trace, "http://b:2");
    }

    #[test]
    fn test_shared_endpoint() {
        let (log, trace) = resolve_endpoints(Some("http://collector:4318"));
        assert_eq!(log, "http://collector:4318");
        assert_eq!(trace, "http://collector:4318");
    }

    #[test]
    fn test_split_endpoint_ignores_extra_segments() {
        let (log, trace) = resolve_endpoints(Some("http://a:1; http://b:2 ;http://c:3"));
        assert_eq!(log, "http://a:1");
        assert_eq!(trace, "http://b:2");
    }

    #[test]
    fn test_empty_endpoint_uses_default() {
        let (log, trace) = resolve_endpoints(Some("  "));
        assert_eq!(log, DEFAULT_ENDPOINT);
        assert_eq!(trace, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_stream_selection() {
        assert_eq!(StreamSelection::from_raw(Some(1)), StreamSelection::LogsOnly);
        assert_eq!(StreamSelection::from_raw(Some(2)), StreamSelection::TracesOnly);
        assert_eq!(StreamSelection::from_raw(Some(3)), StreamSelection::Both);
        assert_eq!(StreamSelection::from_raw(Some(0)), StreamSelection::Both);
        assert_eq!(StreamSelection::from_raw(Some(-7)), StreamSelection::Both);
        assert_eq!(StreamSelection::from_raw(None), StreamSelection::Both);

        assert_eq!(StreamSelection::LogsOnly.kinds(), vec![StreamKind::Log]);
        assert_eq!(StreamSelection::TracesOnly.kinds(), vec![StreamKind::Trace]);
        assert_eq!(
            StreamSelection::Both.kinds(),
            vec![StreamKind::Log, StreamKind::Trace]
        );
    }

    #[test]
    fn test_drain_delay() {
        assert_eq!(resolve_drain_delay(Some(0)), Duration::ZERO);
        assert_eq!(resolve_drain_delay(Some(1500)), Duration::from_millis(1500));
        assert_eq!(resolve_drain_delay(Some(-1)), DEFAULT_DRAIN_DELAY);
    }

    #[test]
    fn test_endpoint_for() {
        let raw = RawRunInput {
            endpoint: Some("http://logs:4318;http://traces:4318".to_string()),
            ..Default::default()
        };
        let config = RunConfig::resolve(&raw, &RawExporterInput::default());
        assert_eq!(config.endpoint_for(StreamKind::Log), "http://logs:4318");
        assert_eq!(config.endpoint_for(StreamKind::Trace), "http://traces:4318");
    }

    #[test]
    fn test_exporter_settings_resolve() {
        let raw = RawExporterInput {
            max_export_batch_size: Some(512),
            scheduled_delay_ms: Some(200),
            ..Default::default()
        };
        let settings = ExporterSettings::resolve(&raw);
        assert_eq!(settings.max_export_batch_size, 512);
        assert_eq!(settings.scheduled_delay, Duration::from_millis(200));
        assert_eq!(settings.max_queue_size, DEFAULT_MAX_QUEUE_SIZE);
        assert_eq!(settings.export_timeout, DEFAULT_EXPORT_TIMEOUT);
    }
}
