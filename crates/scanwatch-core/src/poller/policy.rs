//! Poll interval policy and what to do after a failed status poll.

use std::time::Duration;

use crate::config::PollConfig;

/// High-level classification of a poll failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server asked us to slow down (429).
    RateLimited,
    /// Credential missing or rejected (401/403). Not retried.
    Auth,
    /// Job id unknown to the server (404). Not retried.
    NotFound,
    /// Network failure, 5xx, or an unreadable reply. Retried on the next tick.
    Transient,
}

/// Why polling stopped before the job reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    AuthRejected,
    JobNotFound,
    TooManyFailures,
}

impl HaltReason {
    /// Whether polling may be resumed for the same job id.
    pub fn is_resumable(self) -> bool {
        !matches!(self, HaltReason::JobNotFound)
    }
}

/// Decision returned by the poll policy after a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Keep the current interval; try again on the next tick.
    Retry,
    /// Switch to the backoff interval.
    BackOff,
    /// Stop polling this job.
    Halt(HaltReason),
}

/// Intervals and failure ceiling for the status poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Interval while the job is pending or running.
    pub base_interval: Duration,
    /// Interval once the server has rate limited us.
    pub backoff_interval: Duration,
    /// Consecutive transient failures tolerated before polling halts.
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(3),
            backoff_interval: Duration::from_secs(15),
            max_consecutive_failures: 5,
        }
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(cfg: &PollConfig) -> Self {
        let base_interval = Duration::from_millis(cfg.base_interval_ms.max(1));
        Self {
            base_interval,
            backoff_interval: Duration::from_millis(cfg.backoff_interval_ms).max(base_interval),
            max_consecutive_failures: cfg.max_consecutive_failures.max(1),
        }
    }
}

impl PollPolicy {
    /// Decide what to do after a failed poll.
    ///
    /// `consecutive_failures` counts transient failures in a row, including
    /// this one.
    pub fn decide(&self, consecutive_failures: u32, kind: ErrorKind) -> PollDecision {
        match kind {
            ErrorKind::RateLimited => PollDecision::BackOff,
            ErrorKind::Auth => PollDecision::Halt(HaltReason::AuthRejected),
            ErrorKind::NotFound => PollDecision::Halt(HaltReason::JobNotFound),
            ErrorKind::Transient if consecutive_failures >= self.max_consecutive_failures => {
                PollDecision::Halt(HaltReason::TooManyFailures)
            }
            ErrorKind::Transient => PollDecision::Retry,
        }
    }
}
