//! Mapping from application log levels to OTLP severity numbers.
//!
//! See <https://opentelemetry.io/docs/specs/otel/logs/data-model/#field-severitynumber>.

use crate::record::Level;

/// Severity used for any level the table does not know.
pub const DEFAULT_SEVERITY_NUMBER: i32 = 9;

/// Severity text paired with [`DEFAULT_SEVERITY_NUMBER`].
pub const DEFAULT_SEVERITY_TEXT: &str = "INFO";

/// OTLP severity number for `level`.
///
/// `http` shares INFO's number, `verbose` shares DEBUG's and `silly` shares
/// TRACE's. Unrecognized levels map to [`DEFAULT_SEVERITY_NUMBER`].
pub fn severity_number(level: &Level) -> i32 {
    match level {
        Level::Error => 17,
        Level::Warn => 13,
        Level::Info | Level::Http => 9,
        Level::Verbose | Level::Debug => 5,
        Level::Silly | Level::Trace => 1,
        Level::Other(_) => DEFAULT_SEVERITY_NUMBER,
    }
}

/// Uppercased level name, or [`DEFAULT_SEVERITY_TEXT`] for unrecognized levels.
pub fn severity_text(level: &Level) -> String {
    if level.is_recognized() {
        level.as_str().to_ascii_uppercase()
    } else {
        DEFAULT_SEVERITY_TEXT.to_string()
    }
}
