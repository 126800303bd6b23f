use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{error, info_span};

use tracing_otlp_log_sink::builder::ServiceIdentity;
use tracing_otlp_log_sink::exporter::LogExporter;
use tracing_otlp_log_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_otlp_log_sink::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let exporter = LogExporter::new(ServiceIdentity::new("load-test", "0.1.0"), Arc::new(NoopSink));
    let config = LayerConfig {
        enable_stdout: false,
        shutdown_grace: Duration::from_secs(5),
        ..LayerConfig::default()
    };
    let guard = match init_tracing_with_config(exporter, config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to install subscriber: {}", e);
            return;
        }
    };

    let n: u64 = 100_000;
    let start = Instant::now();

    let span = info_span!(
        "request",
        traceparent = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
    );
    let _entered = span.enter();
    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: emitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let exporter = Arc::clone(guard.exporter());
    let drained = guard.shutdown().await;
    println!("drained: {}, stats: {:?}", drained, exporter.stats());
}
