//! Exporter abstraction
//!
//! An exporter turns events into network traffic toward a collector. The
//! batch drivers only decide *when* to emit; everything about *how* events
//! are encoded, batched and sent belongs behind this seam.
//!
//! # Lifecycle
//!
//! 1. `Exporter::connect()` opens a [`Connection`] bound to one stream and
//!    endpoint
//! 2. `Connection::emit()` hands over events; it never blocks on the network
//! 3. `Connection::close()` flushes what is still queued and releases the
//!    connection. Dropping a connection without closing it also releases it;
//!    queued events are then flushed in the background.
//!
//! # Implementations
//!
//! - **otlp_http**: OTLP/HTTP with JSON encoding and a batch export processor
//! - **mock**: records events in memory, with injectable failures (tests)

pub mod mock;
pub mod otlp_http;
pub mod payload;

use crate::config::StreamKind;
use crate::stats::ExportSnapshot;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub use payload::{Event, EventFactory};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("export queue of the {0} stream is closed")]
    Closed(StreamKind),

    #[error("{event} event emitted on a {connection} connection")]
    KindMismatch {
        event: StreamKind,
        connection: StreamKind,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector returned error: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// Completion of `Connection::close`
pub type CloseFuture = Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send>>;

/// A stream's exclusive, scoped handle on an exporter
pub trait Connection: Send {
    /// Stream this connection belongs to
    fn kind(&self) -> StreamKind;

    /// Endpoint this connection exports to
    fn endpoint(&self) -> &str;

    /// Hand one event to the exporter
    ///
    /// Must not wait on the network. An event that does not fit the queue is
    /// dropped and counted rather than reported as an error.
    fn emit(&mut self, event: Event) -> Result<(), ExportError>;

    /// Flush queued events and release the connection
    fn close(self: Box<Self>) -> CloseFuture;
}

/// Factory for connections
pub trait Exporter: Send + Sync {
    /// Open a connection for `kind` bound to `endpoint`
    fn connect(&self, kind: StreamKind, endpoint: &str) -> Result<Box<dyn Connection>, ExportError>;

    /// Export statistics of the most recent connection for `kind`
    fn stats(&self, kind: StreamKind) -> Option<ExportSnapshot>;
}
