//! Batch driver
//!
//! A batch driver runs one telemetry stream to completion. It opens the
//! stream's exporter connection, optionally waits for the next wall-clock
//! minute, then emits `iterations` batches of `events_per_batch` events,
//! pacing between events and between batches.
//!
//! # Schedule
//!
//! ```text
//! for batch in 0..iterations {
//!     for index in 0..events_per_batch {
//!         emit(batch, index)
//!         wait(delay_between_events)     // also after the last event
//!     }
//!     wait(delay_between_batches)        // also after the last batch
//! }
//! ```
//!
//! # Failure policy
//!
//! The policy depends on the stream kind:
//!
//! - **log**: a failure is logged and recorded in the returned
//!   [`BatchRunResult`]; the driver still returns `Ok`. A log stream that
//!   completes waits for the drain delay before closing its connection so
//!   that the exporter can flush.
//! - **trace**: a failure is returned to the caller.
//!
//! The connection is released on every path. After a failure, events that
//! were already queued are flushed, bounded by the export timeout.
//!
//! # Example
//!
//! ```no_run
//! use otelpulse::config::{RunConfig, StreamKind};
//! use otelpulse::exporter::mock::MockExporter;
//! use otelpulse::util::SystemClock;
//! use otelpulse::worker::BatchDriver;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let driver = BatchDriver::new(
//!     StreamKind::Trace,
//!     Arc::new(RunConfig::default()),
//!     Arc::new(MockExporter::new()),
//!     Arc::new(SystemClock),
//! );
//! let result = driver.run(|_connection, position| {
//!     println!("batch {} event {}", position.batch, position.index);
//!     Ok(())
//! }).await?;
//! println!("{} events", result.events_emitted);
//! # Ok(())
//! # }
//! ```

use crate::config::{RunConfig, StreamKind};
use crate::exporter::{Connection, Exporter};
use crate::stats::{BatchRunResult, StreamProgress};
use crate::util::{delay_to_next_minute, Pacer, WallClock};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Position of an event in a stream's schedule, both 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventPosition {
    /// Outer loop iteration
    pub batch: u32,
    /// Event within the batch
    pub index: u32,
}

/// Runs one stream's batch schedule
pub struct BatchDriver {
    kind: StreamKind,
    config: Arc<RunConfig>,
    exporter: Arc<dyn Exporter>,
    clock: Arc<dyn WallClock>,
    pacer: Pacer,
}

impl BatchDriver {
    pub fn new(
        kind: StreamKind,
        config: Arc<RunConfig>,
        exporter: Arc<dyn Exporter>,
        clock: Arc<dyn WallClock>,
    ) -> Self {
        let pacer = Pacer::new(config.pacing);
        Self {
            kind,
            config,
            exporter,
            clock,
            pacer,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Run the stream to completion
    ///
    /// `emit_one` is called once per event, in schedule order, with the
    /// stream's open connection.
    pub async fn run<F>(&self, mut emit_one: F) -> Result<BatchRunResult>
    where
        F: FnMut(&mut dyn Connection, EventPosition) -> Result<()> + Send,
    {
        let start = Instant::now();
        let mut progress = StreamProgress::default();

        match self.drive(&mut emit_one, &mut progress).await {
            Ok(()) => {
                let result = progress.finish(self.kind, start.elapsed());
                info!(
                    stream = %self.kind,
                    events = result.events_emitted,
                    batches = result.batches_completed,
                    elapsed = ?result.elapsed,
                    "stream completed"
                );
                Ok(result)
            }
            Err(e) if self.kind.suppresses_errors() => {
                let message = format!("{:#}", e);
                error!(
                    stream = %self.kind,
                    events = progress.events_emitted(),
                    error = %message,
                    "stream failed"
                );
                let mut result = progress.finish(self.kind, start.elapsed());
                result.failure = Some(message);
                Ok(result)
            }
            Err(e) => Err(e.context(format!("{} stream failed", self.kind))),
        }
    }

    async fn drive<F>(&self, emit_one: &mut F, progress: &mut StreamProgress) -> Result<()>
    where
        F: FnMut(&mut dyn Connection, EventPosition) -> Result<()> + Send,
    {
        let endpoint = self.config.endpoint_for(self.kind);
        let mut connection = self
            .exporter
            .connect(self.kind, endpoint)
            .with_context(|| format!("Failed to open {} connection to {}", self.kind, endpoint))?;

        let scheduled = self.emit_schedule(connection.as_mut(), emit_one, progress).await;
        if let Err(e) = scheduled {
            self.flush_after_failure(connection).await;
            return Err(e);
        }

        if self.kind.drains_on_completion() && !self.config.drain_delay.is_zero() {
            debug!(stream = %self.kind, delay = ?self.config.drain_delay, "draining");
            tokio::time::sleep(self.config.drain_delay).await;
        }

        connection
            .close()
            .await
            .with_context(|| format!("Failed to close {} connection", self.kind))?;
        Ok(())
    }

    async fn emit_schedule<F>(
        &self,
        connection: &mut dyn Connection,
        emit_one: &mut F,
        progress: &mut StreamProgress,
    ) -> Result<()>
    where
        F: FnMut(&mut dyn Connection, EventPosition) -> Result<()> + Send,
    {
        if self.config.wait_for_minute_boundary {
            let delay = delay_to_next_minute(self.clock.now());
            info!(stream = %self.kind, ?delay, "waiting for the next minute boundary");
            self.pacer.wait(delay).await;
        }

        for batch in 0..self.config.iterations {
            for index in 0..self.config.events_per_batch {
                emit_one(&mut *connection, EventPosition { batch, index })?;
                progress.record_event();
                self.pacer.wait(self.config.delay_between_events).await;
            }
            self.pacer.wait(self.config.delay_between_batches).await;
            progress.record_batch();
            debug!(stream = %self.kind, batch, "batch completed");
        }

        Ok(())
    }

    /// Flush what was queued before a failure, bounded by the export timeout
    ///
    /// A flush that does not finish in time is abandoned; dropping the
    /// connection still releases it.
    async fn flush_after_failure(&self, connection: Box<dyn Connection>) {
        let timeout = self.config.exporter.export_timeout;
        match tokio::time::timeout(timeout, connection.close()).await {
            Ok(Ok(())) => debug!(stream = %self.kind, "flushed after failure"),
            Ok(Err(e)) => warn!(stream = %self.kind, error = %e, "flush after failure failed"),
            Err(_) => warn!(stream = %self.kind, ?timeout, "flush after failure timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::mock::MockExporter;
    use crate::exporter::{Event, EventFactory};
    use crate::util::clock::FixedClock;
    use crate::util::SystemClock;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn config(events_per_batch: u32, iterations: u32) -> RunConfig {
        RunConfig {
            events_per_batch,
            iterations,
            delay_between_events: Duration::ZERO,
            delay_between_batches: Duration::ZERO,
            drain_delay: Duration::ZERO,
            ..RunConfig::default()
        }
    }

    fn driver(kind: StreamKind, config: RunConfig, exporter: &MockExporter) -> BatchDriver {
        BatchDriver::new(
            kind,
            Arc::new(config),
            Arc::new(exporter.clone()),
            Arc::new(SystemClock),
        )
    }

    async fn run_with_factory(driver: &BatchDriver) -> Result<BatchRunResult> {
        let mut factory = EventFactory::with_seed(driver.kind(), Duration::ZERO, 7);
        driver
            .run(move |connection, position| {
                connection.emit(factory.build(position))?;
                Ok(())
            })
            .await
    }

    #[tokio::test]
    async fn test_emits_full_schedule_in_order() {
        let exporter = MockExporter::new();
        let driver = driver(StreamKind::Trace, config(3, 5), &exporter);

        let mut positions = Vec::new();
        let result = driver
            .run(|_connection, position| {
                positions.push(position);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(result.events_emitted, 15);
        assert_eq!(result.batches_completed, 5);
        assert!(result.succeeded());
        let expected: Vec<EventPosition> = (0..5u32)
            .flat_map(|batch| (0..3u32).map(move |index| EventPosition { batch, index }))
            .collect();
        assert_eq!(positions, expected);
        assert!(positions
            .windows(2)
            .all(|w| (w[0].batch, w[0].index) < (w[1].batch, w[1].index)));
    }

    #[tokio::test]
    async fn test_log_bodies_follow_schedule() {
        let exporter = MockExporter::new();
        let driver = driver(StreamKind::Log, config(2, 2), &exporter);
        run_with_factory(&driver).await.unwrap();

        let bodies: Vec<String> = exporter
            .emitted(StreamKind::Log)
            .into_iter()
            .map(|record| match record.event {
                Event::Log(log) => log.body,
                Event::Span(_) => panic!("span on a log connection"),
            })
            .collect();
        assert_eq!(
            bodies,
            vec![
                "Example log record 0 0.",
                "Example log record 0 1.",
                "Example log record 1 0.",
                "Example log record 1 1.",
            ]
        );
        assert_eq!(exporter.connections_closed(StreamKind::Log), 1);
        assert_eq!(exporter.connections_open(StreamKind::Log), 0);
    }

    #[tokio::test]
    async fn test_empty_batches_still_paced() {
        let exporter = MockExporter::new();
        let driver = driver(StreamKind::Trace, config(0, 4), &exporter);

        let result = run_with_factory(&driver).await.unwrap();
        assert_eq!(result.events_emitted, 0);
        assert_eq!(result.batches_completed, 4);
        assert_eq!(exporter.connections_opened(StreamKind::Trace), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_events_and_batches() {
        let exporter = MockExporter::new();
        let driver = driver(
            StreamKind::Trace,
            RunConfig {
                delay_between_events: Duration::from_millis(100),
                delay_between_batches: Duration::from_secs(1),
                ..config(2, 2)
            },
            &exporter,
        );

        let start = Instant::now();
        let result = run_with_factory(&driver).await.unwrap();

        let times: Vec<Instant> = exporter
            .emitted(StreamKind::Trace)
            .iter()
            .map(|record| record.at)
            .collect();
        assert_eq!(times.len(), 4);
        assert!(times[1] - times[0] >= Duration::from_millis(100));
        // Trailing event delay plus the batch delay
        assert!(times[2] - times[1] >= Duration::from_millis(1100));
        assert!(times[3] - times[2] >= Duration::from_millis(100));
        // Trailing delays after the final event and batch
        assert!(start.elapsed() >= Duration::from_millis(2400));
        assert!(result.elapsed >= Duration::from_millis(2400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_minute_boundary() {
        let exporter = MockExporter::new();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap();
        let driver = BatchDriver::new(
            StreamKind::Trace,
            Arc::new(RunConfig {
                wait_for_minute_boundary: true,
                ..config(1, 1)
            }),
            Arc::new(exporter.clone()),
            Arc::new(FixedClock(now)),
        );

        let start = Instant::now();
        run_with_factory(&driver).await.unwrap();

        let first = exporter.emitted(StreamKind::Trace)[0].at;
        assert!(first - start >= Duration::from_millis(30_001));
        assert!(first - start < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_drains_with_connection_open() {
        let exporter = MockExporter::new();
        let driver = driver(
            StreamKind::Log,
            RunConfig {
                drain_delay: Duration::from_secs(10),
                ..config(3, 1)
            },
            &exporter,
        );

        let handle = tokio::spawn(async move { run_with_factory(&driver).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(exporter.emitted_count(StreamKind::Log), 3);
        assert_eq!(exporter.connections_open(StreamKind::Log), 1);

        let result = handle.await.unwrap().unwrap();
        assert!(result.elapsed >= Duration::from_secs(10));
        assert_eq!(exporter.connections_open(StreamKind::Log), 0);
        assert_eq!(exporter.connections_closed(StreamKind::Log), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trace_does_not_drain() {
        let exporter = MockExporter::new();
        let driver = driver(
            StreamKind::Trace,
            RunConfig {
                drain_delay: Duration::from_secs(10),
                ..config(3, 1)
            },
            &exporter,
        );

        let result = run_with_factory(&driver).await.unwrap();
        assert!(result.elapsed < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_trace_failure_propagates() {
        let exporter = MockExporter::new();
        exporter.fail_emit_at(StreamKind::Trace, 2);
        let driver = driver(StreamKind::Trace, config(5, 3), &exporter);

        let err = run_with_factory(&driver).await.unwrap_err();
        assert!(format!("{:#}", err).contains("trace stream failed"));
        assert_eq!(exporter.emitted_count(StreamKind::Trace), 1);
        assert_eq!(exporter.connections_open(StreamKind::Trace), 0);
        assert_eq!(exporter.connections_closed(StreamKind::Trace), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_failure_is_swallowed_without_drain() {
        let exporter = MockExporter::new();
        exporter.fail_emit_at(StreamKind::Log, 2);
        let driver = driver(
            StreamKind::Log,
            RunConfig {
                drain_delay: Duration::from_secs(10),
                ..config(5, 3)
            },
            &exporter,
        );

        let result = run_with_factory(&driver).await.unwrap();
        assert!(!result.succeeded());
        assert!(result.failure.unwrap().contains("mock emit failure"));
        assert_eq!(result.events_emitted, 1);
        assert!(result.elapsed < Duration::from_secs(10));
        assert_eq!(exporter.connections_open(StreamKind::Log), 0);
        // Queued events are flushed before the stream gives up
        assert_eq!(exporter.connections_closed(StreamKind::Log), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_policy() {
        let exporter = MockExporter::new();
        exporter.fail_connect(StreamKind::Log);
        exporter.fail_connect(StreamKind::Trace);

        let log = driver(StreamKind::Log, config(1, 1), &exporter);
        let result = run_with_factory(&log).await.unwrap();
        assert!(result.failure.unwrap().contains("Failed to open log connection"));

        let trace = driver(StreamKind::Trace, config(1, 1), &exporter);
        assert!(run_with_factory(&trace).await.is_err());
    }
}
