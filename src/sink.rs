use crate::wire::WireEnvelope;
use async_trait::async_trait;

/// Reasons a single envelope could not be delivered.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("failed to serialize log envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[cfg(feature = "otlp-http")]
    #[error("log export request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("collector rejected log export with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no tokio runtime available to deliver log envelope")]
    NoRuntime,
}

/// Asynchronous destination for [`WireEnvelope`]s built by the exporter.
///
/// Implementations transport one envelope to a concrete backend. The
/// exporter calls `send` from a spawned task and never awaits it on the
/// application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single envelope.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the envelope.
    /// - `Err(..)` on serialization, network or status failures. The
    ///   exporter reports the error and drops the envelope; it is never
    ///   retried.
    async fn send(&self, envelope: &WireEnvelope) -> Result<(), ExportError>;
}
