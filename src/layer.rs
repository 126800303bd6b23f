use crate::exporter::LogExporter;
use crate::record::{FieldValue, Level as LogLevel, LogEvent};
use crate::trace_context::{TraceContext, TraceContextReader};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never exported. Delivery itself goes through
/// these crates, so exporting their events would feed back into the layer.
pub const DEFAULT_IGNORED_TARGETS: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
];

/// `tracing_subscriber` layer that turns every event into a [`LogEvent`],
/// correlates it with the trace identifiers carried by the enclosing spans
/// and hands it to a [`LogExporter`].
///
/// Spans carry trace identifiers either as a W3C `traceparent` field or as
/// separate `trace_id`, `span_id` and `trace_flags` fields. The nearest
/// span in the event's scope that has them wins.
pub struct OtlpLogLayer {
    exporter: Arc<LogExporter>,
    min_level: Level,
    ignored_targets: Vec<String>,
    code_location: bool,
}

impl OtlpLogLayer {
    /// Layer exporting events of every level through `exporter`.
    pub fn new(exporter: Arc<LogExporter>) -> Self {
        Self {
            exporter,
            min_level: Level::TRACE,
            ignored_targets: DEFAULT_IGNORED_TARGETS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            code_location: false,
        }
    }

    /// Only export events at `level` or more severe.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Skip events whose target is `target` or one of its submodules.
    pub fn ignore_target(mut self, target: impl Into<String>) -> Self {
        self.ignored_targets.push(target.into());
        self
    }

    /// Attach `code.namespace`, `code.filepath` and `code.lineno` metadata.
    pub fn with_code_location(mut self, enabled: bool) -> Self {
        self.code_location = enabled;
        self
    }

    pub fn exporter(&self) -> &Arc<LogExporter> {
        &self.exporter
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|ignored| {
            target == ignored
                || (target.starts_with(ignored.as_str())
                    && target[ignored.len()..].starts_with("::"))
        })
    }
}

impl<S> Layer<S> for OtlpLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = SpanTraceFields::default();
        attrs.record(&mut fields);
        if !fields.is_empty() {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanTraceFields>() {
            values.record(fields);
            return;
        }
        let mut fields = SpanTraceFields::default();
        values.record(&mut fields);
        if !fields.is_empty() {
            extensions.insert(fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > self.min_level || self.is_ignored(meta.target()) {
            return;
        }

        let mut metadata = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut service: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut metadata,
            message: &mut message,
            service: &mut service,
        };
        event.record(&mut visitor);

        if self.code_location {
            if let Some(module) = meta.module_path() {
                metadata.insert("code.namespace".to_string(), FieldValue::from(module));
            }
            if let Some(file) = meta.file() {
                metadata.insert("code.filepath".to_string(), FieldValue::from(file));
            }
            if let Some(line) = meta.line() {
                metadata.insert("code.lineno".to_string(), FieldValue::Int(i64::from(line)));
            }
        }

        let record = LogEvent {
            timestamp: Utc::now(),
            level: LogLevel::from(meta.level()),
            message: message.unwrap_or_default(),
            metadata,
            service,
        };

        let reader = SpanScopeReader { ctx, event };
        self.exporter.emit_with(&record, &reader);
    }
}

/// Reads the active trace from the spans enclosing one event.
struct SpanScopeReader<'a, 'e, 'v, S> {
    ctx: Context<'a, S>,
    event: &'e Event<'v>,
}

impl<S> TraceContextReader for SpanScopeReader<'_, '_, '_, S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn read(&self) -> Option<TraceContext> {
        let scope = self.ctx.event_scope(self.event)?;
        for span in scope {
            let found = span
                .extensions()
                .get::<SpanTraceFields>()
                .and_then(SpanTraceFields::context);
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

/// Trace identifiers recorded on a span, stored in its extensions.
#[derive(Debug, Default, Clone)]
struct SpanTraceFields {
    traceparent: Option<TraceContext>,
    trace_id: Option<String>,
    span_id: Option<String>,
    trace_flags: Option<u8>,
}

impl SpanTraceFields {
    fn is_empty(&self) -> bool {
        self.traceparent.is_none()
            && self.trace_id.is_none()
            && self.span_id.is_none()
            && self.trace_flags.is_none()
    }

    fn context(&self) -> Option<TraceContext> {
        if let (Some(trace_id), Some(span_id)) = (&self.trace_id, &self.span_id) {
            let ctx = TraceContext::new(
                trace_id.as_str(),
                span_id.as_str(),
                self.trace_flags.unwrap_or_default(),
            );
            if ctx.is_valid() {
                return Some(ctx);
            }
        }
        self.traceparent.clone()
    }

    fn set_text(&mut self, name: &str, value: &str) {
        match name {
            "traceparent" => {
                if let Some(ctx) = TraceContext::from_traceparent(value) {
                    self.traceparent = Some(ctx);
                }
            }
            "trace_id" | "traceId" => self.trace_id = Some(value.to_string()),
            "span_id" | "spanId" => self.span_id = Some(value.to_string()),
            "trace_flags" | "traceFlags" => {
                if let Ok(flags) = value.parse::<u8>() {
                    self.trace_flags = Some(flags);
                }
            }
            _ => {}
        }
    }

    fn set_flags(&mut self, name: &str, value: u64) {
        if matches!(name, "trace_flags" | "traceFlags") {
            if let Ok(flags) = u8::try_from(value) {
                self.trace_flags = Some(flags);
            }
        }
    }
}

impl Visit for SpanTraceFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_text(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.set_flags(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Ok(value) = u64::try_from(value) {
            self.set_flags(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{:?}", value);
        self.set_text(field.name(), text.trim_matches('"'));
    }
}

/// Collects event fields into [`LogEvent`] metadata.
///
/// `message` becomes the body and a text `service` field overrides the
/// configured service name; everything else is kept as metadata.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, FieldValue>,
    pub message: &'a mut Option<String>,
    pub service: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => *self.message = Some(value.to_string()),
            "service" => *self.service = Some(value.to_string()),
            name => {
                self.fields.insert(name.to_string(), FieldValue::from(value));
            }
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), FieldValue::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{:?}", value);
        match field.name() {
            "message" => *self.message = Some(text),
            "service" => *self.service = Some(text.trim_matches('"').to_string()),
            name => {
                self.fields.insert(name.to_string(), FieldValue::Text(text));
            }
        }
    }
}
