use crate::record::LogEvent;
use crate::severity::{severity_number, severity_text};
use crate::trace_context::TraceContext;
use crate::wire::{
    AnyValue, KeyValue, Resource, ResourceLogs, Scope, ScopeLogs, WireEnvelope, WireLogRecord,
};

/// Instrumentation scope name reported in every envelope.
pub const SCOPE_NAME: &str = env!("CARGO_PKG_NAME");

/// Instrumentation scope version reported in every envelope.
pub const SCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attribute key carrying the service name.
pub const ATTR_SERVICE_NAME: &str = "service.name";
/// Resource attribute key carrying the service version.
pub const ATTR_SERVICE_VERSION: &str = "service.version";
/// Attribute key carrying the raw, pre-mapping level name.
pub const ATTR_LOG_LEVEL: &str = "log.level";
pub const ATTR_TRACE_ID: &str = "trace_id";
pub const ATTR_SPAN_ID: &str = "span_id";
pub const ATTR_TRACE_FLAGS: &str = "trace_flags";

/// Metadata keys that never become attributes verbatim: they are either
/// promoted to structured record fields or emitted once by the builder.
pub const RESERVED_KEYS: &[&str] = &[
    "level",
    "message",
    "timestamp",
    "service",
    "traceId",
    "spanId",
    "traceFlags",
    ATTR_TRACE_ID,
    ATTR_SPAN_ID,
    ATTR_TRACE_FLAGS,
    ATTR_SERVICE_NAME,
    ATTR_LOG_LEVEL,
];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Service identity attached to every exported record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Turns [`LogEvent`]s into [`WireLogRecord`]s for one service.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    service_name: String,
}

impl RecordBuilder {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Build the wire record for `event`, correlated with `ctx` when a trace
    /// is active. Trace identifiers are copied exactly as given.
    pub fn build(&self, event: &LogEvent, ctx: Option<&TraceContext>) -> WireLogRecord {
        // Event time doubles as observed time.
        let nanos = event
            .timestamp
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .max(0)
            .to_string();

        let service = event.service.as_deref().unwrap_or(&self.service_name);

        let mut attributes = Vec::with_capacity(event.metadata.len() + 5);
        attributes.push(KeyValue::string(ATTR_SERVICE_NAME, service));
        attributes.push(KeyValue::string(ATTR_LOG_LEVEL, event.level.as_str()));
        attributes.extend(
            event
                .metadata
                .iter()
                .filter(|(key, _)| !is_reserved_key(key))
                .map(|(key, value)| KeyValue::string(key.as_str(), value.to_string())),
        );
        if let Some(ctx) = ctx {
            attributes.push(KeyValue::string(ATTR_TRACE_ID, ctx.trace_id.as_str()));
            attributes.push(KeyValue::string(ATTR_SPAN_ID, ctx.span_id.as_str()));
            attributes.push(KeyValue::string(ATTR_TRACE_FLAGS, ctx.trace_flags.to_string()));
        }

        WireLogRecord {
            time_unix_nano: nanos.clone(),
            observed_time_unix_nano: nanos,
            severity_number: severity_number(&event.level),
            severity_text: severity_text(&event.level),
            body: AnyValue {
                string_value: event.message.clone(),
            },
            trace_id: ctx.map(|c| c.trace_id.clone()),
            span_id: ctx.map(|c| c.span_id.clone()),
            trace_flags: ctx.map(|c| c.trace_flags),
            attributes,
        }
    }
}

/// Wrap a single record into the resource/scope/record nesting.
pub fn wrap(record: WireLogRecord, identity: &ServiceIdentity) -> WireEnvelope {
    WireEnvelope {
        resource_logs: vec![ResourceLogs {
            resource: Resource {
                attributes: vec![
                    KeyValue::string(ATTR_SERVICE_NAME, identity.name.as_str()),
                    KeyValue::string(ATTR_SERVICE_VERSION, identity.version.as_str()),
                ],
            },
            scope_logs: vec![ScopeLogs {
                scope: Scope {
                    name: SCOPE_NAME.to_string(),
                    version: SCOPE_VERSION.to_string(),
                },
                log_records: vec![record],
            }],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, Level};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn builder() -> RecordBuilder {
        RecordBuilder::new("orders-api")
    }

    fn active_trace() -> TraceContext {
        TraceContext::new("a".repeat(32), "b".repeat(16), 1)
    }

    #[test]
    fn error_event_without_trace() {
        let event = LogEvent::new("error", "db down").with_field("database", "orders_db");
        let record = builder().build(&event, None);

        assert_eq!(record.severity_number, 17);
        assert_eq!(record.severity_text, "ERROR");
        assert_eq!(record.body.string_value, "db down");
        assert_eq!(record.attribute("service.name"), Some("orders-api"));
        assert_eq!(record.attribute("log.level"), Some("error"));
        assert_eq!(record.attribute("database"), Some("orders_db"));
        assert!(record.trace_id.is_none());
        assert!(record.span_id.is_none());
        assert!(record.trace_flags.is_none());
        assert!(record.attribute(ATTR_TRACE_ID).is_none());
        assert!(record.attribute(ATTR_SPAN_ID).is_none());
        assert!(record.attribute(ATTR_TRACE_FLAGS).is_none());
    }

    #[test]
    fn info_event_with_trace_copies_ids_exactly() {
        let ctx = active_trace();
        let record = builder().build(&LogEvent::new("info", "ok"), Some(&ctx));

        assert_eq!(record.severity_number, 9);
        assert_eq!(record.trace_id.as_deref(), Some("a".repeat(32).as_str()));
        assert_eq!(record.span_id.as_deref(), Some("b".repeat(16).as_str()));
        assert_eq!(record.trace_flags, Some(1));
        assert_eq!(record.attribute(ATTR_TRACE_ID), Some("a".repeat(32).as_str()));
        assert_eq!(record.attribute(ATTR_TRACE_FLAGS), Some("1"));
    }

    #[test]
    fn ids_are_not_normalized() {
        let ctx = TraceContext::new("ABC", "Def", 3);
        let record = builder().build(&LogEvent::new("info", "x"), Some(&ctx));
        assert_eq!(record.trace_id.as_deref(), Some("ABC"));
        assert_eq!(record.span_id.as_deref(), Some("Def"));
        assert_eq!(record.trace_flags, Some(3));
    }

    #[test]
    fn reserved_metadata_is_stripped() {
        let mut event = LogEvent::new("warn", "dup");
        for key in RESERVED_KEYS {
            event = event.with_field(*key, "from-metadata");
        }
        event = event.with_field("user_id", 42i64);

        let record = builder().build(&event, Some(&active_trace()));

        let keys: Vec<&str> = record.attributes.iter().map(|kv| kv.key.as_str()).collect();
        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(keys.len(), unique.len(), "duplicate keys in {:?}", keys);
        for camel in ["traceId", "spanId", "traceFlags", "level", "message", "service"] {
            assert!(!unique.contains(camel), "{} leaked into attributes", camel);
        }
        assert_eq!(record.attribute("service.name"), Some("orders-api"));
        assert_eq!(record.attribute("log.level"), Some("warn"));
        assert_eq!(record.attribute(ATTR_TRACE_ID), Some("a".repeat(32).as_str()));
        assert_eq!(record.attribute("user_id"), Some("42"));
    }

    #[test]
    fn timestamps_are_identical_nanoseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let record = builder().build(&LogEvent::new("info", "t").with_timestamp(ts), None);
        assert_eq!(record.time_unix_nano, "1700000000123456789");
        assert_eq!(record.observed_time_unix_nano, record.time_unix_nano);
    }

    #[test]
    fn empty_message_and_metadata_give_minimal_record() {
        let record = builder().build(&LogEvent::new("debug", ""), None);
        assert_eq!(record.body.string_value, "");
        assert_eq!(record.severity_number, 5);
        assert_eq!(record.attributes.len(), 2);
    }

    #[test]
    fn level_names_outside_the_table_keep_raw_text() {
        for raw in ["WARNING", "ERROR", "Info"] {
            let record = builder().build(&LogEvent::new(raw, "m"), None);
            assert_eq!(record.severity_number, 9, "level {}", raw);
            assert_eq!(record.severity_text, "INFO");
            assert_eq!(record.attribute("log.level"), Some(raw));
        }
    }

    #[test]
    fn service_override_and_unknown_level() {
        let event = LogEvent::new("notice", "hi").with_service("billing");
        let record = builder().build(&event, None);
        assert_eq!(record.attribute("service.name"), Some("billing"));
        assert_eq!(record.attribute("log.level"), Some("notice"));
        assert_eq!(record.severity_number, 9);
        assert_eq!(record.severity_text, "INFO");
        assert_eq!(event.level, Level::Other("notice".to_string()));
    }

    #[test]
    fn metadata_values_are_coerced_to_text() {
        let event = LogEvent::new("info", "m")
            .with_field("ratio", FieldValue::Float(0.25))
            .with_field("cached", false);
        let record = builder().build(&event, None);
        assert_eq!(record.attribute("ratio"), Some("0.25"));
        assert_eq!(record.attribute("cached"), Some("false"));
    }

    #[test]
    fn wrap_produces_single_nesting_with_constant_scope() {
        let identity = ServiceIdentity::new("orders-api", "1.2.3");
        let first = wrap(builder().build(&LogEvent::new("info", "a"), None), &identity);
        let second = wrap(builder().build(&LogEvent::new("error", "b"), None), &identity);

        for envelope in [&first, &second] {
            assert_eq!(envelope.resource_logs.len(), 1);
            let rl = &envelope.resource_logs[0];
            assert_eq!(rl.scope_logs.len(), 1);
            assert_eq!(rl.scope_logs[0].log_records.len(), 1);
            assert_eq!(rl.scope_logs[0].scope.name, SCOPE_NAME);
            assert_eq!(rl.scope_logs[0].scope.version, SCOPE_VERSION);
            assert_eq!(
                rl.resource.attributes,
                vec![
                    KeyValue::string("service.name", "orders-api"),
                    KeyValue::string("service.version", "1.2.3"),
                ]
            );
        }
        assert_eq!(
            first.resource_logs[0].scope_logs[0].scope,
            second.resource_logs[0].scope_logs[0].scope
        );
    }
}
