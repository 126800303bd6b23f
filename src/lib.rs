//! Trace-correlated log export over OTLP/JSON.
//!
//! Every `tracing` event is turned into a [`record::LogEvent`], enriched with
//! the trace identifiers of its enclosing spans, wrapped into an OTLP/JSON
//! envelope and posted to a collector on its own task. Delivery is
//! fire-and-forget: no batching, no retry, and failures only reach the
//! [`diagnostics::FailureReporter`].

pub mod record;
pub mod severity;
pub mod trace_context;
pub mod wire;
pub mod builder;
pub mod sink;
pub mod diagnostics;
pub mod exporter;
pub mod layer;

#[cfg(feature = "otlp-http")]
pub mod otlp_http;

pub mod env;
pub mod init;
pub mod noop_sink;
