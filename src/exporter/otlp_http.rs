//! OTLP/HTTP exporter with JSON encoding
//!
//! Each connection owns a bounded queue drained by a background batch
//! processor task. The processor exports when a full batch has accumulated
//! or when the scheduled delay expires, whichever comes first, and flushes
//! the remainder once the connection is closed or dropped.
//!
//! Export failures are logged and counted but never retried.

use super::payload::{encode_request, resource_for, Attribute, Event};
use super::{CloseFuture, Connection, ExportError, Exporter};
use crate::config::validator::MAX_QUEUE_SIZE;
use crate::config::{ExporterSettings, StreamKind};
use crate::stats::{ExportSnapshot, ExportStats};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Largest buffer preallocated by a batch processor
const MAX_PREALLOCATED_BATCH: usize = 4096;

/// Signal path appended to the endpoint for a stream
pub fn signal_path(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Log => "v1/logs",
        StreamKind::Trace => "v1/traces",
    }
}

/// Build the export URL of a stream from its endpoint
///
/// `http://collector:4318` becomes `http://collector:4318/v1/logs`; a base
/// path on the endpoint is kept.
pub fn signal_url(endpoint: &str, kind: StreamKind) -> Result<Url, ExportError> {
    let invalid = |reason: String| ExportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let mut url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }

    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/{}", base, signal_path(kind)));
    Ok(url)
}

/// OTLP/HTTP JSON exporter
pub struct HttpExporter {
    client: reqwest::Client,
    settings: ExporterSettings,
    stats: Mutex<HashMap<StreamKind, Arc<ExportStats>>>,
}

impl HttpExporter {
    pub fn new(settings: ExporterSettings) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder()
            .timeout(settings.export_timeout)
            .build()?;

        Ok(Self {
            client,
            settings,
            stats: Mutex::new(HashMap::new()),
        })
    }
}

impl Exporter for HttpExporter {
    fn connect(&self, kind: StreamKind, endpoint: &str) -> Result<Box<dyn Connection>, ExportError> {
        let url = signal_url(endpoint, kind)?;
        let stats = Arc::new(ExportStats::new());
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(kind, stats.clone());

        let capacity = self.settings.max_queue_size.clamp(1, MAX_QUEUE_SIZE);
        let (tx, rx) = mpsc::channel(capacity);
        let processor = BatchProcessor {
            kind,
            url: url.clone(),
            client: self.client.clone(),
            resource: resource_for(kind),
            batch_size: self.settings.max_export_batch_size.max(1),
            settings: self.settings.clone(),
            stats: stats.clone(),
            rx,
        };
        let task = tokio::spawn(processor.run());

        debug!(stream = %kind, url = %url, "opened exporter connection");

        Ok(Box::new(HttpConnection {
            kind,
            endpoint: endpoint.to_string(),
            tx: Some(tx),
            task: Some(task),
            stats,
        }))
    }

    fn stats(&self, kind: StreamKind) -> Option<ExportSnapshot> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .map(|stats| stats.snapshot())
    }
}

/// Connection handing events to a background batch processor
///
/// Dropping the connection closes the queue; the processor then flushes
/// what is left and exits on its own.
pub struct HttpConnection {
    kind: StreamKind,
    endpoint: String,
    tx: Option<mpsc::Sender<Event>>,
    task: Option<JoinHandle<()>>,
    stats: Arc<ExportStats>,
}

impl Connection for HttpConnection {
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

        let tx = self.tx.as_ref().ok_or(ExportError::Closed(self.kind))?;
        match tx.try_send(event) {
            Ok(()) => {
                self.stats.record_queued();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(ExportError::Closed(self.kind)),
        }
    }

    fn close(mut self: Box<Self>) -> CloseFuture {
        let kind = self.kind;
        drop(self.tx.take());
        let task = self.task.take();

        Box::pin(async move {
            if let Some(task) = task {
                task.await?;
            }
            debug!(stream = %kind, "closed exporter connection");
            Ok(())
        })
    }
}

/// Background task exporting queued events in batches
struct BatchProcessor {
    kind: StreamKind,
    url: Url,
    client: reqwest::Client,
    resource: Vec<Attribute>,
    batch_size: usize,
    settings: ExporterSettings,
    stats: Arc<ExportStats>,
    rx: mpsc::Receiver<Event>,
}

impl BatchProcessor {
    async fn run(mut self) {
        let mut buffer = Vec::with_capacity(self.batch_size.min(MAX_PREALLOCATED_BATCH));
        let mut ticker = tokio::time::interval(self.settings.scheduled_delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(event) => {
                        buffer.push(event);
                        if buffer.len() >= self.batch_size {
                            self.export(&mut buffer).await;
                            ticker.reset();
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        self.export(&mut buffer).await;
                    }
                }
            }
        }

        if !buffer.is_empty() {
            self.export(&mut buffer).await;
        }
    }

    async fn export(&self, buffer: &mut Vec<Event>) {
        let events = std::mem::take(buffer);
        let count = events.len() as u64;
        let body = encode_request(self.kind, &self.resource, &events);

        let start = Instant::now();
        match self.send(&body).await {
            Ok(()) => {
                let latency = start.elapsed();
                self.stats.record_export(count, latency);
                trace!(stream = %self.kind, events = count, ?latency, "exported batch");
            }
            Err(e) => {
                self.stats.record_failure(count, start.elapsed());
                warn!(stream = %self.kind, events = count, error = %e, "export failed");
            }
        }
    }

    async fn send(&self, body: &serde_json::Value) -> Result<(), ExportError> {
        let response = self.client.post(self.url.clone()).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ExportError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
