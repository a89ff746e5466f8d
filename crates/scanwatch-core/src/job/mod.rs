//! The tracked unit of work: one remote scan request.
//!
//! Fields are read through accessors; only the crate (the lifecycle
//! controller) mutates a job, and only through the transition helpers here,
//! which enforce the status partial order and progress monotonicity.

mod types;

pub use types::{Check, FindingsSummary, JobId, ScanDepth, ScanOptions};

use chrono::{DateTime, Utc};

use crate::status::CanonicalStatus;

/// One scan job as seen by the client.
#[derive(Debug, Clone)]
pub struct ScanJob {
    id: JobId,
    target_url: String,
    options: ScanOptions,
    status: CanonicalStatus,
    raw_status: Option<String>,
    progress_percent: u8,
    reported_progress: Option<f64>,
    estimated_completion_at: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    issues_count: u32,
    findings: Option<FindingsSummary>,
    history: Vec<CanonicalStatus>,
}

impl ScanJob {
    pub(crate) fn new(
        id: JobId,
        target_url: String,
        options: ScanOptions,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            target_url,
            options,
            status: CanonicalStatus::Pending,
            raw_status: None,
            progress_percent: 0,
            reported_progress: None,
            estimated_completion_at: None,
            started_at,
            completed_at: None,
            issues_count: 0,
            findings: None,
            history: vec![CanonicalStatus::Pending],
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn status(&self) -> CanonicalStatus {
        self.status
    }

    /// Last status string exactly as the server sent it. Diagnostics only.
    pub fn raw_status(&self) -> Option<&str> {
        self.raw_status.as_deref()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn reported_progress(&self) -> Option<f64> {
        self.reported_progress
    }

    pub fn estimated_completion_at(&self) -> Option<DateTime<Utc>> {
        self.estimated_completion_at
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn issues_count(&self) -> u32 {
        self.issues_count
    }

    pub fn findings(&self) -> Option<&FindingsSummary> {
        self.findings.as_ref()
    }

    /// Canonical statuses entered by this job, in order.
    pub fn history(&self) -> &[CanonicalStatus] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a normalized server status. Returns the states actually entered
    /// (empty when the report is ignored).
    ///
    /// Pending -> Completed/Failed passes through Running; backwards moves and
    /// anything after a terminal state are dropped.
    pub(crate) fn apply_status(
        &mut self,
        next: CanonicalStatus,
        now: DateTime<Utc>,
    ) -> Vec<CanonicalStatus> {
        if self.status == next || self.status.is_terminal() {
            return Vec::new();
        }
        let path = if self.status.can_transition_to(next) {
            vec![next]
        } else if self.status == CanonicalStatus::Pending
            && CanonicalStatus::Running.can_transition_to(next)
        {
            vec![CanonicalStatus::Running, next]
        } else {
            tracing::debug!(
                job_id = %self.id,
                from = %self.status,
                to = %next,
                "ignoring out-of-order status report"
            );
            return Vec::new();
        };
        for status in &path {
            self.status = *status;
            self.history.push(*status);
        }
        if self.status.is_terminal() {
            self.completed_at = Some(now);
            self.progress_percent = 100;
        }
        path
    }

    /// Record the advisory parts of a status report.
    pub(crate) fn record_report(
        &mut self,
        raw_status: Option<String>,
        reported_progress: Option<f64>,
        estimated_completion_at: Option<DateTime<Utc>>,
    ) {
        self.raw_status = raw_status;
        self.reported_progress = reported_progress;
        self.estimated_completion_at = estimated_completion_at;
    }

    /// Update the findings tally. `issues` (a plain list length) wins over the
    /// summary; when neither is present the previous count is kept.
    pub(crate) fn record_findings(
        &mut self,
        issues_len: Option<usize>,
        summary: Option<FindingsSummary>,
    ) {
        if let Some(n) = issues_len {
            self.issues_count = u32::try_from(n).unwrap_or(u32::MAX);
        } else if let Some(ref s) = summary {
            self.issues_count = s.total();
        }
        if summary.is_some() {
            self.findings = summary;
        }
    }

    /// Raise the displayed progress. Never lowers it; pinned to 100 once terminal.
    pub(crate) fn raise_progress(&mut self, percent: u8) {
        if self.status.is_terminal() {
            self.progress_percent = 100;
        } else {
            self.progress_percent = self.progress_percent.max(percent.min(100));
        }
    }
}
