//! Progress estimate (percent, time remaining) for a scan job.
//!
//! The server may or may not report a numeric progress value and an absolute
//! estimated completion time; consumers get a percentage in [0, 100] either
//! way, plus an optional [`Eta`] while the job is running.

mod eta;

pub use eta::{format_duration, Eta};

use chrono::{DateTime, Utc};

use crate::job::ScanJob;
use crate::status::CanonicalStatus;

/// Stand-in percentage for a running job whose server reports no progress.
pub const RUNNING_DEFAULT_PERCENT: u8 = 50;

/// Snapshot of estimated progress for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEstimate {
    /// Completion percentage in [0, 100].
    pub percent: u8,
    /// Time-remaining estimate; only while running with a server ETA.
    pub eta: Option<Eta>,
}

/// Clamp a server-reported value to a whole percentage. NaN and infinities
/// count as absent.
pub fn clamp_percent(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}

/// Estimate progress for `job` at `now`.
pub fn estimate(job: &ScanJob, now: DateTime<Utc>) -> ProgressEstimate {
    estimate_from(
        job.status(),
        job.reported_progress(),
        job.estimated_completion_at(),
        now,
    )
}

/// Estimate from the raw parts of a status report, without a tracked job.
pub fn estimate_from(
    status: CanonicalStatus,
    reported_progress: Option<f64>,
    estimated_completion_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ProgressEstimate {
    let percent = if status.is_terminal() {
        100
    } else {
        match reported_progress.and_then(clamp_percent) {
            Some(p) => p,
            None if status == CanonicalStatus::Running => RUNNING_DEFAULT_PERCENT,
            None => 0,
        }
    };
    let eta = match (status, estimated_completion_at) {
        (CanonicalStatus::Running, Some(at)) => Some(Eta::until(at, now)),
        _ => None,
    };
    ProgressEstimate { percent, eta }
}
