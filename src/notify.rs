// src/notify.rs - Notification transports
pub use kettle_shared::{Notification, Notifier, NotifyError, Severity};

use tokio::sync::mpsc;

/// Writes notifications to the log. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) -> Result<(), NotifyError> {
        match n.severity {
            Severity::Warning => tracing::warn!(title = %n.title, timeout_ms = n.timeout_ms, "{}", n.message),
            Severity::Success | Severity::Info => {
                tracing::info!(title = %n.title, severity = %n.severity, timeout_ms = n.timeout_ms, "{}", n.message)
            }
        }
        Ok(())
    }
}

/// Forwards notifications into a bounded channel without waiting.
///
/// A full or closed channel drops the notification and reports it.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sender.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(n) => NotifyError::Dropped(n.title),
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}
