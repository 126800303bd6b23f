use crate::builder::{wrap, RecordBuilder, ServiceIdentity};
use crate::diagnostics::{ExportStats, FailureReporter, StatsSnapshot, StderrReporter};
use crate::record::LogEvent;
use crate::sink::{ExportError, LogSink};
use crate::trace_context::{TraceContext, TraceContextReader};
use crate::wire::WireEnvelope;
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Duration;

/// Default time [`LogExporter::shutdown`] callers give in-flight deliveries.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Turns log events into envelopes and delivers each one on its own task.
///
/// `emit` never waits for the network: it builds the envelope, spawns the
/// delivery and returns. There is no batching, retry or backpressure, so a
/// burst of events produces an equal burst of concurrent requests.
/// Failures are counted and passed to the configured [`FailureReporter`].
pub struct LogExporter {
    builder: RecordBuilder,
    identity: ServiceIdentity,
    sink: Arc<dyn LogSink>,
    reporter: Arc<dyn FailureReporter>,
    runtime: Option<Handle>,
    stats: Arc<ExportStats>,
    in_flight: Arc<InFlight>,
}

impl LogExporter {
    /// Create an exporter for `identity` that delivers through `sink`.
    ///
    /// When called inside a Tokio runtime the runtime handle is captured, so
    /// events emitted later from plain threads are still delivered on it.
    pub fn new(identity: ServiceIdentity, sink: Arc<dyn LogSink>) -> Self {
        Self {
            builder: RecordBuilder::new(identity.name.clone()),
            identity,
            sink,
            reporter: Arc::new(StderrReporter),
            runtime: Handle::try_current().ok(),
            stats: Arc::new(ExportStats::default()),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of deliveries spawned but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Build the envelope for `event` without sending it.
    pub fn envelope(&self, event: &LogEvent, ctx: Option<&TraceContext>) -> WireEnvelope {
        wrap(self.builder.build(event, ctx), &self.identity)
    }

    /// Export `event`, correlated with `ctx` when a trace is active.
    pub fn emit(&self, event: &LogEvent, ctx: Option<&TraceContext>) {
        self.stats.emitted.fetch_add(1, Ordering::Relaxed);
        self.deliver(self.envelope(event, ctx));
    }

    /// Export `event`, asking `reader` for the active trace.
    pub fn emit_with(&self, event: &LogEvent, reader: &dyn TraceContextReader) {
        let ctx = reader.read();
        self.emit(event, ctx.as_ref());
    }

    /// Hand `envelope` to a new delivery task and return immediately.
    pub fn deliver(&self, envelope: WireEnvelope) {
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            self.reporter.report(&ExportError::NoRuntime);
            return;
        };

        let guard = InFlightGuard::enter(&self.in_flight);
        let sink = Arc::clone(&self.sink);
        let reporter = Arc::clone(&self.reporter);
        let stats = Arc::clone(&self.stats);

        runtime.spawn(async move {
            let _guard = guard;
            match sink.send(&envelope).await {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    reporter.report(&e);
                }
            }
        });
    }

    /// Wait up to `grace` for in-flight deliveries to finish.
    ///
    /// Returns `true` if everything finished in time. Deliveries still
    /// running afterwards are abandoned, never cancelled.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.in_flight.wait_idle())
            .await
            .is_ok()
    }
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_context::NoActiveTrace;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingReporter(Mutex<Vec<String>>);

    impl FailureReporter for RecordingReporter {
        fn report(&self, error: &ExportError) {
            self.0.lock().unwrap().push(error.to_string());
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl LogSink for RejectingSink {
        async fn send(&self, _envelope: &WireEnvelope) -> Result<(), ExportError> {
            Err(ExportError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<WireEnvelope>);

    #[async_trait]
    impl LogSink for ChannelSink {
        async fn send(&self, envelope: &WireEnvelope) -> Result<(), ExportError> {
            let _ = self.0.send(envelope.clone());
            Ok(())
        }
    }

    struct StalledSink;

    #[async_trait]
    impl LogSink for StalledSink {
        async fn send(&self, _envelope: &WireEnvelope) -> Result<(), ExportError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn identity() -> ServiceIdentity {
        ServiceIdentity::new("orders-api", "0.3.0")
    }

    fn handle_request(exporter: &LogExporter) -> u32 {
        exporter.emit(&LogEvent::new("error", "db down"), None);
        200
    }

    #[tokio::test]
    async fn failed_delivery_only_reaches_the_reporter() {
        let reporter = Arc::new(RecordingReporter::default());
        let exporter = LogExporter::new(identity(), Arc::new(RejectingSink))
            .with_reporter(reporter.clone());

        assert_eq!(handle_request(&exporter), 200);
        assert!(exporter.shutdown(Duration::from_secs(1)).await);

        let reports = reporter.0.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("503"), "{}", reports[0]);
        let stats = exporter.stats();
        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[tokio::test]
    async fn one_envelope_per_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let exporter = LogExporter::new(identity(), Arc::new(ChannelSink(tx)));

        let ctx = TraceContext::new("a".repeat(32), "b".repeat(16), 1);
        exporter.emit(&LogEvent::new("info", "first"), Some(&ctx));
        exporter.emit_with(&LogEvent::new("warn", "second"), &NoActiveTrace);
        assert!(exporter.shutdown(Duration::from_secs(1)).await);

        let mut bodies = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            assert_eq!(envelope.records().count(), 1);
            let record = envelope.records().next().unwrap().clone();
            bodies.push((record.body.string_value, record.trace_id));
        }
        bodies.sort();
        assert_eq!(
            bodies,
            vec![
                ("first".to_string(), Some("a".repeat(32))),
                ("second".to_string(), None),
            ]
        );
        assert_eq!(exporter.stats().delivered, 2);
    }

    #[tokio::test]
    async fn shutdown_abandons_stalled_deliveries() {
        let exporter = LogExporter::new(identity(), Arc::new(StalledSink));
        exporter.emit(&LogEvent::new("info", "stuck"), None);

        assert_eq!(exporter.in_flight(), 1);
        assert!(!exporter.shutdown(Duration::from_millis(50)).await);
    }

    #[test]
    fn emitting_without_runtime_is_reported_not_raised() {
        let reporter = Arc::new(RecordingReporter::default());
        let exporter = LogExporter::new(identity(), Arc::new(RejectingSink))
            .with_reporter(reporter.clone());

        exporter.emit(&LogEvent::new("info", "no runtime"), None);

        assert_eq!(exporter.stats().dropped, 1);
        assert_eq!(exporter.in_flight(), 0);
        let reports = reporter.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("no tokio runtime"));
    }
}
