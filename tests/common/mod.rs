//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing_otlp_log_sink::builder::ServiceIdentity;
use tracing_otlp_log_sink::diagnostics::FailureReporter;
use tracing_otlp_log_sink::exporter::LogExporter;
use tracing_otlp_log_sink::sink::{ExportError, LogSink};
use tracing_otlp_log_sink::wire::{WireEnvelope, WireLogRecord};

pub const TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
pub const SPAN_ID: &str = "00f067aa0ba902b7";
pub const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

pub fn identity() -> ServiceIdentity {
    ServiceIdentity::new("orders-api", "1.4.0")
}

/// Sink forwarding every envelope into a channel.
pub struct ChannelSink(pub mpsc::UnboundedSender<WireEnvelope>);

#[async_trait]
impl LogSink for ChannelSink {
    async fn send(&self, envelope: &WireEnvelope) -> Result<(), ExportError> {
        let _ = self.0.send(envelope.clone());
        Ok(())
    }
}

/// Reporter keeping every failure message.
#[derive(Default)]
pub struct RecordingReporter(pub Mutex<Vec<String>>);

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, error: &ExportError) {
        self.0.lock().unwrap().push(error.to_string());
    }
}

pub fn channel_exporter() -> (Arc<LogExporter>, mpsc::UnboundedReceiver<WireEnvelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let exporter = LogExporter::new(identity(), Arc::new(ChannelSink(tx)));
    (Arc::new(exporter), rx)
}

/// Drain the channel and return the single record of every envelope.
pub fn drain_records(rx: &mut mpsc::UnboundedReceiver<WireEnvelope>) -> Vec<WireLogRecord> {
    let mut records = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        let mut inner: Vec<WireLogRecord> = envelope.records().cloned().collect();
        assert_eq!(inner.len(), 1, "one record per envelope");
        records.append(&mut inner);
    }
    records
}
