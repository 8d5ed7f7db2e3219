//! Mock exporter for testing
//!
//! Records every emitted event in memory instead of sending it anywhere,
//! which makes driver and coordinator tests fast and deterministic.
//!
//! # Features
//!
//! - Tracks emitted events per stream, with the (tokio) instant of each emit
//! - Injectable failures: refuse to connect, or fail the n-th emit
//! - Counts connections opened, closed and released
//!
//! # Example
//!
//! ```
//! use otelpulse::config::StreamKind;
//! use otelpulse::exporter::mock::MockExporter;
//! use otelpulse::exporter::Exporter;
//!
//! let exporter = MockExporter::new();
//! exporter.fail_connect(StreamKind::Trace);
//!
//! assert!(exporter.connect(StreamKind::Log, "http://localhost:4318").is_ok());
//! assert!(exporter.connect(StreamKind::Trace, "http://localhost:4318").is_err());
//! ```

use super::{CloseFuture, Connection, Event, ExportError, Exporter};
use crate::config::StreamKind;
use crate::stats::{ExportSnapshot, ExportStats};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Record of an emitted event for test verification
#[derive(Debug, Clone)]
pub struct EmitRecord {
    pub event: Event,
    pub at: Instant,
    pub endpoint: String,
}

#[derive(Default)]
struct MockState {
    emitted: HashMap<StreamKind, Vec<EmitRecord>>,
    /// Emit number (1-based, per connection) that fails
    emit_failures: HashMap<StreamKind, u64>,
    connect_failures: HashSet<StreamKind>,
    opened: HashMap<StreamKind, u64>,
    closed: HashMap<StreamKind, u64>,
    released: HashMap<StreamKind, u64>,
    stats: HashMap<StreamKind, Arc<ExportStats>>,
}

/// In-memory exporter
#[derive(Clone, Default)]
pub struct MockExporter {
    state: Arc<Mutex<MockState>>,
}

impl MockExporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the `nth` emit (1-based) on each connection of `kind` fail
    pub fn fail_emit_at(&self, kind: StreamKind, nth: u64) {
        self.state().emit_failures.insert(kind, nth);
    }

    /// Refuse to open connections for `kind`
    pub fn fail_connect(&self, kind: StreamKind) {
        self.state().connect_failures.insert(kind);
    }

    /// All events emitted on `kind` connections, in emit order
    pub fn emitted(&self, kind: StreamKind) -> Vec<EmitRecord> {
        self.state().emitted.get(&kind).cloned().unwrap_or_default()
    }

    pub fn emitted_count(&self, kind: StreamKind) -> usize {
        self.state().emitted.get(&kind).map_or(0, Vec::len)
    }

    pub fn connections_opened(&self, kind: StreamKind) -> u64 {
        self.state().opened.get(&kind).copied().unwrap_or(0)
    }

    /// Connections explicitly closed with `Connection::close`
    pub fn connections_closed(&self, kind: StreamKind) -> u64 {
        self.state().closed.get(&kind).copied().unwrap_or(0)
    }

    /// Connections released, whether closed or dropped
    pub fn connections_released(&self, kind: StreamKind) -> u64 {
        self.state().released.get(&kind).copied().unwrap_or(0)
    }

    /// Connections of `kind` currently held by someone
    pub fn connections_open(&self, kind: StreamKind) -> u64 {
        self.connections_opened(kind) - self.connections_released(kind)
    }
}

impl Exporter for MockExporter {
    fn connect(&self, kind: StreamKind, endpoint: &str) -> Result<Box<dyn Connection>, ExportError> {
        let mut state = self.state();
        if state.connect_failures.contains(&kind) {
            return Err(ExportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "connection refused by mock".to_string(),
            });
        }

        *state.opened.entry(kind).or_insert(0) += 1;
        let stats = Arc::new(ExportStats::new());
        state.stats.insert(kind, stats.clone());

        Ok(Box::new(MockConnection {
            kind,
            endpoint: endpoint.to_string(),
            emits: 0,
            stats,
            state: self.state.clone(),
        }))
    }

    fn stats(&self, kind: StreamKind) -> Option<ExportSnapshot> {
        self.state().stats.get(&kind).map(|stats| stats.snapshot())
    }
}

struct MockConnection {
    kind: StreamKind,
    endpoint: String,
    emits: u64,
    stats: Arc<ExportStats>,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connection for MockConnection {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn emit(&mut self, event: Event) -> Result<(), ExportError> {
        if event.kind() != self.kind {
            return Err(ExportError::KindMismatch {
                event: event.kind(),
                connection: self.kind,
            });
        }

        self.emits += 1;
        let record = EmitRecord {
            event,
            at: Instant::now(),
            endpoint: self.endpoint.clone(),
        };

        let mut state = self.state();
        if state.emit_failures.get(&self.kind) == Some(&self.emits) {
            return Err(ExportError::Other(format!(
                "mock emit failure on {} event {}",
                self.kind, self.emits
            )));
        }
        state.emitted.entry(self.kind).or_default().push(record);
        drop(state);

        self.stats.record_queued();
        self.stats.record_export(1, Duration::ZERO);
        Ok(())
    }

    fn close(self: Box<Self>) -> CloseFuture {
        *self.state().closed.entry(self.kind).or_insert(0) += 1;
        drop(self);
        Box::pin(async { Ok(()) })
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        *self.state().released.entry(self.kind).or_insert(0) += 1;
    }
}
