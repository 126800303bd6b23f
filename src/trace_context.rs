//! Identifiers of the trace a log event belongs to.
//!
//! The tracing runtime that owns spans is an external collaborator; this
//! crate only ever *reads* the identifiers through [`TraceContextReader`].

/// W3C `traceparent` version understood by [`TraceContext::from_traceparent`].
const TRACEPARENT_VERSION: &str = "00";

/// Identifiers of the active trace and span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceContext {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters.
    pub span_id: String,
    pub trace_flags: u8,
}

impl TraceContext {
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>, trace_flags: u8) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            trace_flags,
        }
    }

    /// `true` when both ids have the canonical width, are lowercase hex and
    /// are not all zeros.
    pub fn is_valid(&self) -> bool {
        is_valid_id(&self.trace_id, 32) && is_valid_id(&self.span_id, 16)
    }

    /// Whether the sampled bit is set in `trace_flags`.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags & 0x01 == 0x01
    }

    /// Parse a W3C `traceparent` header value, e.g.
    /// `00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01`.
    ///
    /// Returns `None` for anything malformed.
    pub fn from_traceparent(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() || version != TRACEPARENT_VERSION || flags.len() != 2 {
            return None;
        }
        if !flags.bytes().all(is_lower_hex) {
            return None;
        }
        let trace_flags = u8::from_str_radix(flags, 16).ok()?;

        let ctx = Self::new(trace_id, span_id, trace_flags);
        ctx.is_valid().then_some(ctx)
    }

    pub fn to_traceparent(&self) -> String {
        format!(
            "{}-{}-{}-{:02x}",
            TRACEPARENT_VERSION, self.trace_id, self.span_id, self.trace_flags
        )
    }
}

fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

fn is_valid_id(id: &str, width: usize) -> bool {
    id.len() == width && id.bytes().all(is_lower_hex) && id.bytes().any(|b| b != b'0')
}

/// Read access to "the currently active trace".
///
/// Implementations must not block and must not fail: no active trace is
/// reported as `None`.
pub trait TraceContextReader {
    fn read(&self) -> Option<TraceContext>;
}

/// Reader for call sites that are never inside a trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActiveTrace;

impl TraceContextReader for NoActiveTrace {
    fn read(&self) -> Option<TraceContext> {
        None
    }
}

impl TraceContextReader for TraceContext {
    fn read(&self) -> Option<TraceContext> {
        Some(self.clone())
    }
}

impl TraceContextReader for Option<TraceContext> {
    fn read(&self) -> Option<TraceContext> {
        self.clone()
    }
}
