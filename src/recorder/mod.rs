//! # Log Recorders
//!
//! The recorder is the single capability the engine depends on for making
//! call-lifecycle records visible or durable. `record` must not fail:
//! logging is a side channel and a misbehaving sink must never change the
//! outcome of a call.

pub mod console;
pub mod stream;

use crate::record::LogRecord;

pub use console::ConsoleRecorder;
pub use stream::StreamRecorder;

/// Sink for structured log records.
///
/// Implementations swallow their own I/O failures (at most noting them via
/// `tracing`); they never propagate errors into call routing.
pub trait LogRecorder: Send + Sync + 'static {
    fn record(&self, record: &LogRecord);
}

/// Recorder that discards everything. Used as the default so contexts
/// never have to null-check their recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl LogRecorder for NullRecorder {
    fn record(&self, _record: &LogRecord) {}
}
