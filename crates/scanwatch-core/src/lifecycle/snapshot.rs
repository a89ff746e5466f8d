//! Read-only view of the controller for UIs.

use std::time::Duration;

use crate::job::ScanJob;
use crate::poller::HaltReason;
use crate::progress::Eta;
use crate::status::CanonicalStatus;

/// Where the controller's state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No job.
    Idle,
    /// Job exists and is being polled.
    Polling,
    /// Job is not terminal but polling stopped.
    Halted(HaltReason),
    /// Job reached Completed, Failed or Cancelled.
    Terminal(CanonicalStatus),
}

/// The action a UI should offer once polling is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallToAction {
    ViewResults,
    Retry,
    StartNew,
}

impl CallToAction {
    pub fn for_state(state: ControllerState) -> Option<Self> {
        match state {
            ControllerState::Terminal(CanonicalStatus::Completed) => Some(CallToAction::ViewResults),
            ControllerState::Terminal(CanonicalStatus::Failed) => Some(CallToAction::Retry),
            ControllerState::Terminal(_) => Some(CallToAction::StartNew),
            ControllerState::Halted(_) => Some(CallToAction::Retry),
            ControllerState::Idle | ControllerState::Polling => None,
        }
    }
}

/// Copy of everything a UI renders. Never aliases controller state.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub state: ControllerState,
    pub job: Option<ScanJob>,
    pub eta: Option<Eta>,
    pub elapsed: Duration,
    /// Interval of the next status poll while polling.
    pub poll_interval: Option<Duration>,
    pub rate_limited: bool,
    /// Force-reset/resume affordance should be offered.
    pub recovery_available: bool,
    pub call_to_action: Option<CallToAction>,
}
