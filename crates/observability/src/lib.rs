//! Tracing, logging and error reporting (shared setup).

/// Initialize process-wide observability (tracing/logging) with defaults.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(&LogConfig::default());
}

/// Initialize observability with an explicit log configuration.
pub fn init_with(config: &LogConfig) {
    self::tracing::init(config);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Where best-effort failures are reported.
pub mod sink;

pub use sink::{ErrorReport, ErrorSink, RecordingErrorSink, TracingErrorSink};
pub use self::tracing::{LogConfig, LogFormat, ParseLogFormatError};
