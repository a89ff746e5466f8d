//! Cancellation strategies and the stuck-job heuristic.
//!
//! Force-reset is an ordered list of steps, each producing a typed outcome;
//! the first success decides the result. The same runner backs the CLI's
//! `cancel --force`.

use std::time::Duration;

use crate::api::ScanApi;
use crate::config::StuckConfig;
use crate::error::ScanError;
use crate::job::JobId;
use crate::status::CanonicalStatus;

/// One way of asking the server to stop a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    /// Privileged cancel (`force=true`).
    ForceCancel,
    /// Ordinary cancel.
    Cancel,
}

impl RecoveryStep {
    /// Steps tried by a force-reset, in order.
    pub const FORCE_RESET: [RecoveryStep; 2] = [RecoveryStep::ForceCancel, RecoveryStep::Cancel];

    pub fn is_forced(self) -> bool {
        matches!(self, RecoveryStep::ForceCancel)
    }
}

/// Result of running one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded(RecoveryStep),
    Failed(RecoveryStep, ScanError),
}

/// Every step attempted, in order. Stops after the first success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyReport {
    pub attempts: Vec<StepOutcome>,
}

impl StrategyReport {
    pub fn succeeded_with(&self) -> Option<RecoveryStep> {
        self.attempts.iter().find_map(|a| match a {
            StepOutcome::Succeeded(step) => Some(*step),
            StepOutcome::Failed(..) => None,
        })
    }

    /// Error of the last attempted step, when it failed.
    pub fn final_error(&self) -> Option<&ScanError> {
        match self.attempts.last() {
            Some(StepOutcome::Failed(_, err)) => Some(err),
            _ => None,
        }
    }
}

/// Run `steps` in order against the scan service until one succeeds.
pub async fn run_steps(api: &dyn ScanApi, id: &JobId, steps: &[RecoveryStep]) -> StrategyReport {
    let mut report = StrategyReport::default();
    for step in steps {
        match api.cancel(id, step.is_forced()).await {
            Ok(()) => {
                tracing::info!(job_id = %id, ?step, "cancel step succeeded");
                report.attempts.push(StepOutcome::Succeeded(*step));
                break;
            }
            Err(err) => {
                tracing::warn!(job_id = %id, ?step, "cancel step failed: {}", err);
                report.attempts.push(StepOutcome::Failed(*step, err));
            }
        }
    }
    report
}

/// Outcome of a force-reset, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// A step succeeded; `status` is the job's status afterwards.
    Reset {
        via: RecoveryStep,
        status: CanonicalStatus,
    },
    /// Every step failed; the job was left as is and the user must reload.
    ManualReloadRequired { error: ScanError },
    /// The id does not name the controller's job.
    NoSuchJob,
}

/// Result of an ordinary cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// Already cancelled; nothing was sent.
    AlreadyCancelled,
    /// Completed or failed; nothing was sent.
    AlreadyTerminal(CanonicalStatus),
}

/// When a running job counts as stuck near completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckPolicy {
    pub progress_percent: u8,
    pub after: Duration,
}

impl Default for StuckPolicy {
    fn default() -> Self {
        Self {
            progress_percent: 95,
            after: Duration::from_secs(300),
        }
    }
}

impl From<&StuckConfig> for StuckPolicy {
    fn from(cfg: &StuckConfig) -> Self {
        Self {
            progress_percent: cfg.progress_percent.min(100),
            after: Duration::from_secs(cfg.after_secs),
        }
    }
}
