use crate::sink::{ExportError, LogSink};
use crate::wire::WireEnvelope;
use async_trait::async_trait;

/// A sink that simply drops all envelopes.
///
/// Useful for measuring the overhead of record building and task spawning
/// without any network I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _envelope: &WireEnvelope) -> Result<(), ExportError> {
        Ok(())
    }
}
