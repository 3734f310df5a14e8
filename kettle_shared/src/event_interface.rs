use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// User-facing notification. Emitted as a side effect only; the control core
/// never reads one back.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub timeout_ms: u64,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        timeout_ms: u64,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            timeout_ms,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(title, message, Severity::Info, timeout_ms)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(title, message, Severity::Success, timeout_ms)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(title, message, Severity::Warning, timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification dropped: {0}")]
    Dropped(String),
    #[error("Notification transport closed")]
    Closed,
}

/// Fire-and-forget notification transport.
///
/// `notify` must not block. Failures are returned so the caller can log them;
/// they are never retried.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}
