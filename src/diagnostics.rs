//! Side channel for export failures.
//!
//! Failures are never surfaced to the code that emitted the log event. They
//! are counted in [`ExportStats`] and handed to a [`FailureReporter`].
//! Reporters must not log through `tracing`: the export layer would pick the
//! report up and try to ship it, failing the same way again.

use crate::sink::ExportError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives every delivery failure.
pub trait FailureReporter: Send + Sync {
    fn report(&self, error: &ExportError);
}

/// Writes failures to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrReporter;

impl FailureReporter for StderrReporter {
    fn report(&self, error: &ExportError) {
        eprintln!("log export failed: {}", error);
    }
}

/// Counters maintained by the exporter.
#[derive(Debug, Default)]
pub struct ExportStats {
    /// Events handed to the exporter.
    pub emitted: AtomicU64,
    /// Envelopes the sink accepted.
    pub delivered: AtomicU64,
    /// Envelopes the sink rejected or failed to send.
    pub failed: AtomicU64,
    /// Events dropped before a delivery task could be spawned.
    pub dropped: AtomicU64,
}

/// Point-in-time copy of [`ExportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub emitted: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl ExportStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
