//! otelpulse - Synthetic OTLP telemetry load generator
//!
//! otelpulse emits configurable streams of log records and trace spans toward
//! an OTLP collector at a controlled rate, batch size and cadence, optionally
//! phase-aligned to wall-clock minute boundaries. It is used to exercise and
//! benchmark telemetry-ingestion pipelines.
//!
//! # Architecture
//!
//! - **Clock alignment**: delay until the next wall-clock minute boundary
//! - **Pacing**: precise short waits, scheduler-friendly long waits
//! - **Batch driver**: nested batch/event loop for a single stream
//! - **Coordinator**: runs the log and trace streams concurrently to completion
//! - **Exporter**: scoped connections with an OTLP/HTTP JSON batch processor

pub mod config;
pub mod coordinator;
pub mod exporter;
pub mod output;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::RunConfig;
pub use coordinator::{Coordinator, RunReport};
pub use exporter::{Connection, Exporter};

/// Result type used throughout otelpulse
pub type Result<T> = anyhow::Result<T>;
