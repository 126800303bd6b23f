use crate::exporter::{LogExporter, DEFAULT_SHUTDOWN_GRACE};
use crate::layer::OtlpLogLayer;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the export layer.
///
/// **Fields**
/// - `min_level`: least severe level that is still exported.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is added
///   next to [`OtlpLogLayer`] and events are printed to the console too.
/// - `code_location`: attach module/file/line metadata to every record.
/// - `shutdown_grace`: how long [`ExportGuard::shutdown`] waits for
///   in-flight deliveries.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_level: Level,
    pub enable_stdout: bool,
    pub code_location: bool,
    pub shutdown_grace: Duration,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_level: Level::TRACE,
            enable_stdout: true,
            code_location: false,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Error type returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid export configuration: {0}")]
    Config(#[from] crate::env::ConfigError),

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Keeps the exporter reachable after the subscriber is installed.
///
/// Call [`ExportGuard::shutdown`] before the process exits to give
/// in-flight deliveries a bounded chance to finish.
pub struct ExportGuard {
    exporter: Arc<LogExporter>,
    grace: Duration,
}

impl ExportGuard {
    pub fn exporter(&self) -> &Arc<LogExporter> {
        &self.exporter
    }

    /// Returns `true` if every in-flight delivery finished within the grace period.
    pub async fn shutdown(self) -> bool {
        self.exporter.shutdown(self.grace).await
    }
}

/// Install a global `tracing` subscriber exporting through `exporter`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`OtlpLogLayer`] (and optionally
/// the `fmt` layer) as the global default subscriber, so all `tracing`
/// events in the process are observed by the layer.
pub fn init_tracing_with_config(
    exporter: LogExporter,
    config: LayerConfig,
) -> Result<ExportGuard, InitError> {
    let exporter = Arc::new(exporter);
    let layer = OtlpLogLayer::new(Arc::clone(&exporter))
        .with_min_level(config.min_level)
        .with_code_location(config.code_location);

    // The two branches build different subscriber types.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(ExportGuard {
        exporter,
        grace: config.shutdown_grace,
    })
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(exporter: LogExporter) -> Result<ExportGuard, InitError> {
    init_tracing_with_config(exporter, LayerConfig::default())
}

/// Read [`crate::env::ExportConfig`] from the environment, build an
/// [`crate::otlp_http::OtlpHttpSink`] and install the subscriber.
///
/// Must be called inside a Tokio runtime so deliveries have somewhere to run.
#[cfg(feature = "otlp-http")]
pub fn init_from_env(config: LayerConfig) -> Result<ExportGuard, InitError> {
    use crate::otlp_http::OtlpHttpSink;

    let export = crate::env::ExportConfig::from_env()?;
    let sink = OtlpHttpSink::new(export.sink_config());
    let exporter = LogExporter::new(export.identity, Arc::new(sink));
    init_tracing_with_config(exporter, config)
}
