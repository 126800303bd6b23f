use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Application-level log level.
///
/// Covers the level names used by common logging taxonomies (including the
/// `http`, `verbose` and `silly` levels some of them add). Only the exact
/// lowercase names are recognized; anything else, including other casings,
/// is kept verbatim in [`Level::Other`] so the raw value can still be
/// reported downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Error,
    Warn,
    Info,
    Http,
    Verbose,
    Debug,
    Silly,
    Trace,
    Other(String),
}

impl Level {
    /// Raw level name as it should appear in the `log.level` attribute.
    pub fn as_str(&self) -> &str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Http => "http",
            Level::Verbose => "verbose",
            Level::Debug => "debug",
            Level::Silly => "silly",
            Level::Trace => "trace",
            Level::Other(raw) => raw,
        }
    }

    /// `true` for every variant except [`Level::Other`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Level::Other(_))
    }
}

impl From<&str> for Level {
    fn from(raw: &str) -> Self {
        match raw {
            "error" => Level::Error,
            "warn" => Level::Warn,
            "info" => Level::Info,
            "http" => Level::Http,
            "verbose" => Level::Verbose,
            "debug" => Level::Debug,
            "silly" => Level::Silly,
            "trace" => Level::Trace,
            other => Level::Other(other.to_string()),
        }
    }
}

impl From<String> for Level {
    fn from(raw: String) -> Self {
        Level::from(raw.as_str())
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::TRACE => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar metadata value attached to a [`LogEvent`].
///
/// Values keep their type until the record builder flattens them into
/// string attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(FieldValue::Int)
            .unwrap_or_else(|_| FieldValue::Text(value.to_string()))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A single structured log event as produced by application code.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub metadata: BTreeMap<String, FieldValue>,
    /// Overrides the configured service name for this event only.
    pub service: Option<String>,
}

impl LogEvent {
    /// Event stamped with the current time and no metadata.
    pub fn new(level: impl Into<Level>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
            service: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
