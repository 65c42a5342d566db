//! User-visible notification sink (toast bus boundary).
//!
//! The coordinator treats this purely as an output: it never owns the
//! sink's lifecycle, and only human-readable text crosses it. Underlying
//! causes go to the log, not the toast.

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Receives user-facing notifications.
pub trait NotifySink: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Sink that drops everything (headless use, tests).
pub struct NullSink;

impl NotifySink for NullSink {
    fn notify(&self, _message: &str, _severity: Severity) {}
}
