//! Lifecycle controller: owns the active scan job and everything that mutates it.
//!
//! One task drives the controller through `&mut self`. Timers and spawned
//! status requests never touch the job; they send [`Event`]s into the
//! controller's channel, and [`LifecycleController::step`] (or
//! [`LifecycleController::settle`] in tests) applies them. Every event
//! carries the generation it was issued under. Retiring a job (terminal
//! status, halt, cancel, new submission) moves it to a fresh generation, so
//! anything still queued from before is dropped unseen.

mod elapsed;
mod events;
mod recovery;
mod snapshot;


pub(crate) use events::{Event, EventSender};
pub use recovery::{
    run_steps, CancelOutcome, RecoveryStep, ResetOutcome, StepOutcome, StrategyReport, StuckPolicy,
};
pub use snapshot::{CallToAction, ControllerState, JobSnapshot};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::{ScanApi, StatusResponse};
use crate::error::ScanError;
use crate::job::{JobId, ScanJob, ScanOptions};
use crate::notify::{Notification, NotificationKind, NotificationSink, Severity};
use crate::poller::{HaltReason, PollDecision, PollPolicy, StatusPoller};
use crate::progress;
use crate::scheduler::{Clock, Scheduler, SystemClock, TokioScheduler};
use crate::status::{self, CanonicalStatus};
use crate::submit::JobSubmitter;
use elapsed::ElapsedTimer;

/// The job being tracked plus its timers.
struct ActiveJob {
    job: ScanJob,
    generation: u64,
    poller: StatusPoller,
    elapsed: ElapsedTimer,
    halted: Option<HaltReason>,
    /// First poll at which the running job reached the stuck threshold.
    near_complete_since: Option<DateTime<Utc>>,
}

/// What to do once the borrow of the active job has ended.
enum FollowUp {
    None,
    Finish,
    Halt(HaltReason, ScanError),
}

pub struct LifecycleController {
    api: Arc<dyn ScanApi>,
    sink: Arc<dyn NotificationSink>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    stuck: StuckPolicy,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<Event>,
    next_generation: u64,
    active: Option<ActiveJob>,
}

impl LifecycleController {
    pub fn new(
        api: Arc<dyn ScanApi>,
        sink: Arc<dyn NotificationSink>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        policy: PollPolicy,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            sink,
            scheduler,
            clock,
            policy,
            stuck: StuckPolicy::default(),
            events_tx,
            events_rx,
            next_generation: 0,
            active: None,
        }
    }

    /// Controller on tokio timers and the system clock.
    pub fn with_tokio(
        api: Arc<dyn ScanApi>,
        sink: Arc<dyn NotificationSink>,
        policy: PollPolicy,
    ) -> Self {
        Self::new(
            api,
            sink,
            Arc::new(TokioScheduler),
            Arc::new(SystemClock),
            policy,
        )
    }

    pub fn with_stuck_policy(mut self, stuck: StuckPolicy) -> Self {
        self.stuck = stuck;
        self
    }

    pub fn state(&self) -> ControllerState {
        match &self.active {
            None => ControllerState::Idle,
            Some(a) if a.job.is_terminal() => ControllerState::Terminal(a.job.status()),
            Some(a) => match a.halted {
                Some(reason) => ControllerState::Halted(reason),
                None => ControllerState::Polling,
            },
        }
    }

    pub fn job(&self) -> Option<&ScanJob> {
        self.active.as_ref().map(|a| &a.job)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state();
        let now = self.clock.now();
        let Some(active) = &self.active else {
            return JobSnapshot {
                state,
                job: None,
                eta: None,
                elapsed: std::time::Duration::ZERO,
                poll_interval: None,
                rate_limited: false,
                recovery_available: false,
                call_to_action: None,
            };
        };
        JobSnapshot {
            state,
            job: Some(active.job.clone()),
            eta: progress::estimate(&active.job, now).eta,
            elapsed: active.elapsed.elapsed(),
            poll_interval: active
                .poller
                .is_active()
                .then(|| active.poller.interval()),
            rate_limited: active.poller.is_backed_off(),
            recovery_available: self.recovery_available(),
            call_to_action: CallToAction::for_state(state),
        }
    }

    /// Running at or above the stuck threshold for at least the stuck window.
    pub fn is_stuck(&self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if active.job.status() != CanonicalStatus::Running || active.halted.is_some() {
            return false;
        }
        active.near_complete_since.is_some_and(|since| {
            (self.clock.now() - since)
                .to_std()
                .is_ok_and(|held| held >= self.stuck.after)
        })
    }

    /// Whether the UI should offer force-reset or resume.
    pub fn recovery_available(&self) -> bool {
        self.is_stuck() || matches!(self.state(), ControllerState::Halted(_))
    }

    fn fresh_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn notify(&self, severity: Severity, kind: NotificationKind, message: String) {
        self.sink.notify(Notification::new(severity, kind, message));
    }

    /// Start polling `job` under a fresh generation; tick 0 goes out now.
    fn install(&mut self, job: ScanJob) {
        // Dropping the previous job's timers disposes them.
        self.active = None;
        let generation = self.fresh_generation();
        let poller = StatusPoller::new(
            self.policy,
            Arc::clone(&self.scheduler),
            self.events_tx.clone(),
            generation,
        );
        let elapsed = ElapsedTimer::start(
            Arc::clone(&self.scheduler),
            self.events_tx.clone(),
            generation,
        );
        tracing::debug!(job_id = %job.id(), generation, "tracking scan job");
        let mut active = ActiveJob {
            job,
            generation,
            poller,
            elapsed,
            halted: None,
            near_complete_since: None,
        };
        let id = active.job.id().clone();
        active.poller.tick(&self.api, &id);
        self.active = Some(active);
    }

    /// Validate and submit a scan, then start polling it.
    ///
    /// While a job is being polled this fails with [`ScanError::Busy`]; the
    /// caller must cancel or start over first.
    pub async fn submit(&mut self, target: &str, options: ScanOptions) -> Result<JobId, ScanError> {
        if self.state() == ControllerState::Polling {
            let err = ScanError::Busy;
            self.notify(
                Severity::Warning,
                NotificationKind::SubmissionFailed,
                format!("Could not start scan: {err}"),
            );
            return Err(err);
        }
        let submitter = JobSubmitter::new(Arc::clone(&self.api), Arc::clone(&self.clock));
        match submitter.submit(target, options).await {
            Ok(job) => {
                let id = job.id().clone();
                let target = job.target_url().to_string();
                self.install(job);
                self.notify(
                    Severity::Success,
                    NotificationKind::SubmissionSucceeded,
                    format!("Scan started for {target}"),
                );
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(url = target, "scan submission failed: {}", err);
                self.notify(
                    Severity::Error,
                    NotificationKind::SubmissionFailed,
                    format!("Could not start scan: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Resubmit the current job's target and options as a new job.
    pub async fn retry(&mut self) -> Result<JobId, ScanError> {
        let (target, options) = match (&self.active, self.state()) {
            (_, ControllerState::Polling) => return Err(ScanError::Busy),
            (Some(active), _) => (active.job.target_url().to_string(), *active.job.options()),
            (None, _) => {
                return Err(ScanError::Validation("no previous scan to retry".into()));
            }
        };
        self.submit(&target, options).await
    }

    /// Forget the current job and dispose its timers.
    pub fn start_new_scan(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(job_id = %active.job.id(), "discarding scan job");
        }
    }

    /// Leave `Halted` and poll again from tick 0. A job the server no longer
    /// knows cannot be resumed. No-op unless halted.
    pub fn resume_polling(&mut self) -> Result<(), ScanError> {
        let generation = self.fresh_generation();
        let Some(active) = self.active.as_mut() else {
            return Err(ScanError::Validation("no scan to resume".into()));
        };
        match active.halted {
            None => return Ok(()),
            Some(reason) if !reason.is_resumable() => return Err(ScanError::NotFound),
            Some(_) => {}
        }
        active.halted = None;
        active.generation = generation;
        active.poller = StatusPoller::new(
            self.policy,
            Arc::clone(&self.scheduler),
            self.events_tx.clone(),
            generation,
        );
        active.elapsed = ElapsedTimer::start(
            Arc::clone(&self.scheduler),
            self.events_tx.clone(),
            generation,
        );
        let id = active.job.id().clone();
        tracing::info!(job_id = %id, generation, "resuming status polling");
        active.poller.tick(&self.api, &id);
        Ok(())
    }

    fn active_for(&self, id: &JobId) -> Option<&ActiveJob> {
        self.active.as_ref().filter(|a| a.job.id() == id)
    }

    /// Ask the server to cancel `id`. Cancelling a cancelled job is a no-op.
    pub async fn cancel(&mut self, id: &JobId) -> Result<CancelOutcome, ScanError> {
        let Some(active) = self.active_for(id) else {
            return Err(ScanError::NoSuchJob(id.clone()));
        };
        match active.job.status() {
            CanonicalStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
            s if s.is_terminal() => return Ok(CancelOutcome::AlreadyTerminal(s)),
            _ => {}
        }
        match self.api.cancel(id, false).await {
            Ok(()) => {
                self.mark_cancelled();
                self.notify(
                    Severity::Success,
                    NotificationKind::CancelSucceeded,
                    "Scan cancelled".to_string(),
                );
                Ok(CancelOutcome::Cancelled)
            }
            Err(err) => {
                tracing::warn!(job_id = %id, "cancel failed: {}", err);
                self.notify(
                    Severity::Error,
                    NotificationKind::CancelFailed,
                    format!("Could not cancel scan: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Escalating cancel for a job that looks stuck: privileged cancel, then an
    /// ordinary one. Emits exactly one notification describing what decided
    /// the outcome.
    pub async fn force_reset(&mut self, id: &JobId) -> ResetOutcome {
        if self.active_for(id).is_none() {
            self.notify(
                Severity::Warning,
                NotificationKind::ForceReset,
                format!("No scan {id} to reset"),
            );
            return ResetOutcome::NoSuchJob;
        }
        let report = run_steps(self.api.as_ref(), id, &RecoveryStep::FORCE_RESET).await;
        match (report.succeeded_with(), report.final_error()) {
            (Some(via), _) => {
                let was_terminal = self.job().is_some_and(ScanJob::is_terminal);
                if !was_terminal {
                    self.mark_cancelled();
                }
                let status = self.job().map_or(CanonicalStatus::Cancelled, ScanJob::status);
                let message = match via {
                    RecoveryStep::ForceCancel => "Scan was force-reset",
                    RecoveryStep::Cancel => "Scan cancelled",
                };
                self.notify(
                    Severity::Success,
                    NotificationKind::ForceReset,
                    message.to_string(),
                );
                ResetOutcome::Reset { via, status }
            }
            (None, err) => {
                let error = err
                    .cloned()
                    .unwrap_or_else(|| ScanError::Protocol("no cancel step ran".into()));
                self.notify(
                    Severity::Error,
                    NotificationKind::ForceReset,
                    format!("Could not cancel scan ({error}); reload to check its state"),
                );
                ResetOutcome::ManualReloadRequired { error }
            }
        }
    }

    /// Server confirmed cancellation: move the job to Cancelled and retire
    /// its timers.
    fn mark_cancelled(&mut self) {
        let now = self.clock.now();
        let generation = self.fresh_generation();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.job.apply_status(CanonicalStatus::Cancelled, now);
        active.generation = generation;
        active.halted = None;
        active.near_complete_since = None;
        active.poller.stop();
        let started = active.job.started_at();
        active
            .elapsed
            .freeze(started, active.job.completed_at().unwrap_or(now));
        tracing::info!(job_id = %active.job.id(), "scan cancelled");
    }

    /// Wait for the next event and apply it. Returns false once the job is no
    /// longer being polled.
    pub async fn step(&mut self) -> bool {
        if self.state() != ControllerState::Polling {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => self.handle(event),
            None => return false,
        }
        self.state() == ControllerState::Polling
    }

    /// Apply every queued event and wait for the outstanding status request,
    /// if any. Never waits for a timer.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle(event);
            }
            let (in_flight, lost) = match &self.active {
                Some(a) => (a.poller.has_request_in_flight(), a.poller.request_lost()),
                None => (false, false),
            };
            if !in_flight {
                return;
            }
            if lost {
                if let Ok(event) = self.events_rx.try_recv() {
                    self.handle(event);
                    continue;
                }
                tracing::warn!("status request ended without a reply");
                if let Some(active) = self.active.as_mut() {
                    active.poller.request_done();
                }
                return;
            }
            match self.events_rx.recv().await {
                Some(event) => self.handle(event),
                None => return,
            }
        }
    }

    fn handle(&mut self, event: Event) {
        let Some(active) = &self.active else {
            tracing::trace!(?event, "no active job, dropping event");
            return;
        };
        if event.generation() != active.generation {
            tracing::trace!(
                job_id = %active.job.id(),
                stale = event.generation(),
                current = active.generation,
                "dropping stale event"
            );
            return;
        }
        match event {
            Event::PollDue { .. } => self.on_poll_due(),
            Event::StatusArrived { result, .. } => self.on_status(result),
            Event::ElapsedTick { .. } => self.on_elapsed_tick(),
        }
    }

    fn on_poll_due(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let id = active.job.id().clone();
        active.poller.tick(&self.api, &id);
    }

    fn on_elapsed_tick(&mut self) {
        let now = self.clock.now();
        if let Some(active) = self.active.as_mut() {
            let started = active.job.started_at();
            active.elapsed.on_tick(started, now);
        }
    }

    fn on_status(&mut self, result: Result<StatusResponse, ScanError>) {
        let now = self.clock.now();
        let stuck_percent = self.stuck.progress_percent;
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.poller.request_done();
        let follow_up = match result {
            Ok(reply) => {
                active.poller.record_success();
                let canonical = status::normalize(reply.status.as_deref());
                let eta_at = reply.estimated_completion_at();
                let findings = reply.findings();
                active
                    .job
                    .record_report(reply.status, reply.progress, eta_at);
                active
                    .job
                    .record_findings(reply.issues.as_ref().map(Vec::len), findings);
                for entered in active.job.apply_status(canonical, now) {
                    tracing::info!(
                        job_id = %active.job.id(),
                        generation = active.generation,
                        status = %entered,
                        "scan status changed"
                    );
                }
                let estimate = progress::estimate(&active.job, now);
                active.job.raise_progress(estimate.percent);
                if active.job.status() == CanonicalStatus::Running
                    && active.job.progress_percent() >= stuck_percent
                {
                    active.near_complete_since.get_or_insert(now);
                } else {
                    active.near_complete_since = None;
                }
                if active.job.is_terminal() {
                    FollowUp::Finish
                } else {
                    FollowUp::None
                }
            }
            Err(err) => match active.poller.record_error(&err) {
                PollDecision::Retry => {
                    tracing::warn!(
                        job_id = %active.job.id(),
                        failures = active.poller.consecutive_failures(),
                        "status poll failed, retrying next tick: {}",
                        err
                    );
                    FollowUp::None
                }
                PollDecision::BackOff => {
                    if active.poller.enter_backoff() {
                        tracing::warn!(
                            job_id = %active.job.id(),
                            interval_ms = active.poller.interval().as_millis() as u64,
                            "rate limited, slowing down status polling"
                        );
                        self.sink.notify(Notification::new(
                            Severity::Warning,
                            NotificationKind::RateLimited,
                            "The scan service is busy; checking less often",
                        ));
                    }
                    FollowUp::None
                }
                PollDecision::Halt(reason) => FollowUp::Halt(reason, err),
            },
        };
        match follow_up {
            FollowUp::None => {}
            FollowUp::Finish => self.finish(),
            FollowUp::Halt(reason, err) => self.halt(reason, err),
        }
    }

    /// Job reached a terminal status: retire timers and tell the user.
    fn finish(&mut self) {
        let generation = self.fresh_generation();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.generation = generation;
        active.near_complete_since = None;
        active.poller.stop();
        let job = &active.job;
        let started = job.started_at();
        active
            .elapsed
            .freeze(started, job.completed_at().unwrap_or(started));
        let (severity, message) = match job.status() {
            CanonicalStatus::Completed => (
                Severity::Success,
                format!(
                    "Scan of {} completed: {} issue(s) found",
                    job.target_url(),
                    job.issues_count()
                ),
            ),
            CanonicalStatus::Failed => (
                Severity::Error,
                format!("Scan of {} failed", job.target_url()),
            ),
            _ => (
                Severity::Info,
                format!("Scan of {} was cancelled", job.target_url()),
            ),
        };
        tracing::info!(
            job_id = %job.id(),
            status = %job.status(),
            requests = active.poller.requests_sent(),
            skipped_ticks = active.poller.ticks_skipped(),
            "scan finished"
        );
        self.sink
            .notify(Notification::new(severity, NotificationKind::ScanFinished, message));
    }

    fn halt(&mut self, reason: HaltReason, err: ScanError) {
        let generation = self.fresh_generation();
        let limit = self.policy.max_consecutive_failures;
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.generation = generation;
        active.halted = Some(reason);
        active.near_complete_since = None;
        active.poller.stop();
        active.elapsed.stop();
        let id = active.job.id();
        tracing::warn!(job_id = %id, ?reason, "status polling halted: {}", err);
        let message = match reason {
            HaltReason::AuthRejected => {
                "Not authorized to check scan status; sign in again and resume".to_string()
            }
            HaltReason::JobNotFound => format!("Scan {id} no longer exists on the server"),
            HaltReason::TooManyFailures => {
                format!("Lost contact with the scan service after {limit} attempts ({err})")
            }
        };
        self.sink.notify(Notification::new(
            Severity::Error,
            NotificationKind::PollingHalted,
            message,
        ));
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state())
            .field("job_id", &self.job().map(ScanJob::id))
            .field("policy", &self.policy)
            .finish()
    }
}
