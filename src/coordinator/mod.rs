//! Stream coordinator
//!
//! Runs the selected log and trace streams concurrently, one batch driver
//! per stream, and waits for every stream to finish before reporting. A
//! trace failure is surfaced only after the log stream has also finished;
//! log failures, panics included, never fail the run.

use crate::config::{RunConfig, StreamKind, StreamSelection};
use crate::exporter::{EventFactory, Exporter};
use crate::stats::{BatchRunResult, ExportSnapshot};
use crate::util::WallClock;
use crate::worker::BatchDriver;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Outcome of one stream
#[derive(Debug, Clone)]
pub struct StreamReport {
    pub result: BatchRunResult,
    /// Exporter statistics of the stream's connection, if it was opened
    pub export: Option<ExportSnapshot>,
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub selection: StreamSelection,
    pub logs: Option<StreamReport>,
    pub traces: Option<StreamReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn stream(&self, kind: StreamKind) -> Option<&StreamReport> {
        match kind {
            StreamKind::Log => self.logs.as_ref(),
            StreamKind::Trace => self.traces.as_ref(),
        }
    }

    pub fn streams(&self) -> impl Iterator<Item = &StreamReport> {
        self.logs.iter().chain(self.traces.iter())
    }

    pub fn total_events(&self) -> u64 {
        self.streams().map(|s| s.result.events_emitted).sum()
    }
}

/// Launches and awaits the selected streams
pub struct Coordinator {
    config: Arc<RunConfig>,
    exporter: Arc<dyn Exporter>,
    clock: Arc<dyn WallClock>,
}

impl Coordinator {
    pub fn new(config: Arc<RunConfig>, exporter: Arc<dyn Exporter>, clock: Arc<dyn WallClock>) -> Self {
        Self {
            config,
            exporter,
            clock,
        }
    }

    /// Run every selected stream to completion
    ///
    /// Returns the trace stream's error if it failed. A log stream task that
    /// panics is recorded as a failed log stream, like any other log failure.
    pub async fn run(&self) -> Result<RunReport> {
        let selection = self.config.stream_selection;
        let start = Instant::now();

        let handles: Vec<(StreamKind, JoinHandle<Result<BatchRunResult>>)> = selection
            .kinds()
            .into_iter()
            .map(|kind| (kind, self.spawn_stream(kind)))
            .collect();

        info!(streams = %selection, "started {} stream(s)", handles.len());

        // Join every stream before acting on any failure
        let mut outcomes = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) if kind.suppresses_errors() => {
                    error!(stream = %kind, error = %e, "stream task failed");
                    Ok(BatchRunResult {
                        kind,
                        events_emitted: 0,
                        batches_completed: 0,
                        elapsed: start.elapsed(),
                        failure: Some(format!("stream task failed: {}", e)),
                    })
                }
                Err(e) => Err(anyhow::anyhow!("{} stream task failed: {}", kind, e)),
            };
            debug!(stream = %kind, ok = outcome.is_ok(), "stream joined");
            outcomes.push((kind, outcome));
        }

        let mut report = RunReport {
            selection,
            logs: None,
            traces: None,
            elapsed: start.elapsed(),
        };

        for (kind, outcome) in outcomes {
            let stream = StreamReport {
                result: outcome?,
                export: self.exporter.stats(kind),
            };
            match kind {
                StreamKind::Log => report.logs = Some(stream),
                StreamKind::Trace => report.traces = Some(stream),
            }
        }

        Ok(report)
    }

    fn spawn_stream(&self, kind: StreamKind) -> JoinHandle<Result<BatchRunResult>> {
        let driver = BatchDriver::new(
            kind,
            self.config.clone(),
            self.exporter.clone(),
            self.clock.clone(),
        );
        let mut factory = EventFactory::new(kind, &self.config);

        tokio::spawn(async move {
            driver
                .run(move |connection, position| {
                    connection.emit(factory.build(position))?;
                    Ok(())
                })
                .await
        })
    }
}
