use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, info_span};
use tracing_otlp_log_sink::{
    builder::ServiceIdentity,
    exporter::LogExporter,
    init::init_tracing,
    sink::{ExportError, LogSink},
    wire::WireEnvelope,
};

/// Example of integrating a completely custom backend by implementing
/// the `LogSink` trait directly. Here every envelope is printed as the
/// JSON document an OTLP collector would receive.
struct StdoutJsonSink;

#[async_trait]
impl LogSink for StdoutJsonSink {
    async fn send(&self, envelope: &WireEnvelope) -> Result<(), ExportError> {
        println!("[otlp-json] {}", envelope.to_json()?);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let exporter = LogExporter::new(
        ServiceIdentity::new("custom-backend-demo", env!("CARGO_PKG_VERSION")),
        Arc::new(StdoutJsonSink),
    );
    let guard = match init_tracing(exporter) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to install subscriber: {}", e);
            return;
        }
    };

    info!("custom backend example started");

    let span = info_span!(
        "checkout",
        trace_id = "4bf92f3577b34da6a3ce929d0e0e4736",
        span_id = "00f067aa0ba902b7",
        trace_flags = 1u64
    );
    span.in_scope(|| {
        error!(database = "orders_db", "db down");
    });

    guard.shutdown().await;
}
