//! Statistics collection
//!
//! Two kinds of statistics are tracked:
//!
//! - **Stream progress**: events emitted and batches completed by a batch
//!   driver, summarised as a [`BatchRunResult`] when the stream ends
//! - **Export statistics**: lock-free counters for queued, dropped and
//!   exported events plus an export request latency histogram, shared
//!   between an exporter connection and its background export task
//!
//! # Example
//!
//! ```
//! use otelpulse::stats::ExportStats;
//! use std::time::Duration;
//!
//! let stats = ExportStats::new();
//! stats.record_queued();
//! stats.record_export(1, Duration::from_millis(3));
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.exported, 1);
//! ```

pub mod histogram;

use crate::config::StreamKind;
use crate::util::time::calculate_rate;
use histogram::LatencyHistogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of one stream's batch driver
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRunResult {
    pub kind: StreamKind,
    /// Events handed to the exporter connection
    pub events_emitted: u64,
    /// Batches whose inner loop and inter-batch pacing both finished
    pub batches_completed: u64,
    /// Wall-clock time from start to return, including alignment and drain
    pub elapsed: Duration,
    /// Error that ended a log stream early; always None for trace streams
    pub failure: Option<String>,
}

impl BatchRunResult {
    /// Achieved event rate over the whole run
    pub fn events_per_second(&self) -> f64 {
        calculate_rate(self.events_emitted, self.elapsed)
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Running tally kept by a batch driver
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamProgress {
    events_emitted: u64,
    batches_completed: u64,
}

impl StreamProgress {
    #[inline]
    pub fn record_event(&mut self) {
        self.events_emitted += 1;
    }

    #[inline]
    pub fn record_batch(&mut self) {
        self.batches_completed += 1;
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted
    }

    pub fn batches_completed(&self) -> u64 {
        self.batches_completed
    }

    pub fn finish(self, kind: StreamKind, elapsed: Duration) -> BatchRunResult {
        BatchRunResult {
            kind,
            events_emitted: self.events_emitted,
            batches_completed: self.batches_completed,
            elapsed,
            failure: None,
        }
    }
}

/// Exporter counters for one stream
///
/// Counters use `Ordering::Relaxed`; no ordering is needed between them.
#[derive(Debug, Default)]
pub struct ExportStats {
    queued: AtomicU64,
    dropped: AtomicU64,
    exported: AtomicU64,
    failed_events: AtomicU64,
    requests: AtomicU64,
    failed_requests: AtomicU64,
    latency: Mutex<LatencyHistogram>,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// An event was accepted into the export queue
    #[inline]
    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    /// An event was discarded because the export queue was full
    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// A successful export request carrying `events` events
    pub fn record_export(&self, events: u64, latency: Duration) {
        self.exported.fetch_add(events, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    /// A failed export request; its events are lost
    pub fn record_failure(&self, events: u64, latency: Duration) {
        self.failed_events.fetch_add(events, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    fn record_latency(&self, latency: Duration) {
        let mut hist = self.latency.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        hist.record(latency);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> ExportSnapshot {
        let latency = self
            .latency
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        ExportSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            exported: self.exported.load(Ordering::Relaxed),
            failed_events: self.failed_events.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            latency,
        }
    }
}

/// Copy of [`ExportStats`] taken at the end of a run
#[derive(Debug, Clone, Default)]
pub struct ExportSnapshot {
    pub queued: u64,
    pub dropped: u64,
    pub exported: u64,
    pub failed_events: u64,
    pub requests: u64,
    pub failed_requests: u64,
    pub latency: LatencyHistogram,
}
