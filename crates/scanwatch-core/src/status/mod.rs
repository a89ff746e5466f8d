//! Canonical scan status and normalization of server status spellings.
//!
//! The scan service reports status in an uncontrolled vocabulary
//! (`in_progress`, `IN PROGRESS`, `Completed`, `canceled`, ...). Everything
//! downstream reads only [`CanonicalStatus`]; the raw string is kept on the
//! job for diagnostics.

mod normalize;

pub use normalize::normalize;

use serde::{Deserialize, Serialize};

/// One of the five normalized job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl CanonicalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::Running => "running",
            CanonicalStatus::Completed => "completed",
            CanonicalStatus::Failed => "failed",
            CanonicalStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, Failed or Cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CanonicalStatus::Completed | CanonicalStatus::Failed | CanonicalStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a single legal step of the partial order
    /// Pending -> Running -> {Completed, Failed, Cancelled}, Pending -> Cancelled.
    pub fn can_transition_to(self, next: CanonicalStatus) -> bool {
        use CanonicalStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
