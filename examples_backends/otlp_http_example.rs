use tracing::{info, info_span, warn};
use tracing_otlp_log_sink::env::{OTLP_LOGS_ENDPOINT_ENV, SERVICE_NAME_ENV};
use tracing_otlp_log_sink::init::{init_from_env, LayerConfig};

/// Ships logs to the collector named by `OTLP_LOGS_ENDPOINT`, e.g.
///
/// ```text
/// OTLP_LOGS_ENDPOINT=http://localhost:4318/v1/logs \
/// OTLP_LOGS_ACCESS_TOKEN=secret SERVICE_NAME=demo-api \
///     cargo run --example otlp_http_example
/// ```
#[tokio::main]
async fn main() {
    let guard = match init_from_env(LayerConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!(
                "set {} (and optionally {}): {}",
                OTLP_LOGS_ENDPOINT_ENV, SERVICE_NAME_ENV, e
            );
            return;
        }
    };

    // Outside any span: exported without trace correlation.
    info!("service started");

    // An incoming request carrying a W3C traceparent header.
    let request = info_span!(
        "http_request",
        method = "GET",
        route = "/orders",
        traceparent = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
    );
    request.in_scope(|| {
        info!(order_count = 3u64, "listed orders");
        warn!(latency_ms = 812.5, "slow response");
    });

    if !guard.shutdown().await {
        eprintln!("some log deliveries were still in flight at exit");
    }
}
