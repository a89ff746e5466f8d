//! User-facing notifications (toast/alert channel).
//!
//! The controller emits a [`Notification`] for every event the user should
//! see; where it ends up (terminal, GUI toast, log) is the sink's business.

mod sinks;

pub use sinks::ChannelSink;

/// Severity tag carried by every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Info => "info",
        }
    }
}

/// What happened, independent of wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    SubmissionSucceeded,
    SubmissionFailed,
    RateLimited,
    CancelSucceeded,
    CancelFailed,
    ForceReset,
    ScanFinished,
    PollingHalted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}

/// Receives notifications. Must not block; called from the controller task.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}
