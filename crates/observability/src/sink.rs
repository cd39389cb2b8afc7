//! Observability sink for failures that must not fail the caller.
//!
//! After-commit side effects (notifications, job enqueues) are best-effort.
//! Their failures end up here instead of in the caller's error path.

use std::sync::Mutex;

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Component that failed (e.g. "after_commit:publish_state_change").
    pub component: String,
    /// Entity the failure relates to, if any.
    pub subject: Option<String>,
    pub message: String,
}

pub trait ErrorSink: Send + Sync {
    fn report(&self, report: ErrorReport);
}

/// Emits reports as `error!` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, report: ErrorReport) {
        tracing::error!(
            component = %report.component,
            subject = report.subject.as_deref().unwrap_or("-"),
            error = %report.message,
            "best-effort operation failed"
        );
    }
}

/// Keeps reports in memory and forwards them to tracing (tests/dev).
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    reports: Mutex<Vec<ErrorReport>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, report: ErrorReport) {
        TracingErrorSink.report(report.clone());
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}
