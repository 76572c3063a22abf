//! # Log sink collaborator for forwarded child log records.
//!
//! The supervisor recognizes log-shaped messages and hands them to a
//! [`LogSink`]; storage and formatting are the sink's concern — the
//! supervisor forwards, never stores.
//!
//! ## Implementing custom sinks
//! ```rust
//! use procvisor::{LogRecord, LogSink};
//! use async_trait::async_trait;
//!
//! struct Collector;
//!
//! #[async_trait]
//! impl LogSink for Collector {
//!     async fn handle(&self, record: &LogRecord) {
//!         // persist, ship, or count the record...
//!         let _ = record.raw();
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::messages::LogRecord;

/// Contract for log-record consumers.
///
/// Called from the supervisor's reader task. Implementations may be slow
/// (I/O, batching); they should avoid blocking the async runtime.
#[async_trait]
pub trait LogSink: Send + Sync + 'static {
    /// Accepts one forwarded log record.
    async fn handle(&self, record: &LogRecord);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Simple stdout sink.
///
/// Prints each record as one JSON line, prefixed with the supervised
/// worker's name. Honors the supervisor's `silent` flag by suppressing
/// console echo entirely. Not intended for production use — implement a
/// custom [`LogSink`] for structured storage.
pub struct StdoutSink {
    worker: String,
    silent: bool,
}

impl StdoutSink {
    /// Creates a sink echoing records for the given worker name.
    pub fn new(worker: impl Into<String>, silent: bool) -> Self {
        Self {
            worker: worker.into(),
            silent,
        }
    }
}

#[async_trait]
impl LogSink for StdoutSink {
    async fn handle(&self, record: &LogRecord) {
        if self.silent {
            return;
        }
        let line = serde_json::to_string(record.raw()).unwrap_or_default();
        println!("[{}] {line}", self.worker);
    }

    fn name(&self) -> &'static str {
        "stdout-sink"
    }
}
