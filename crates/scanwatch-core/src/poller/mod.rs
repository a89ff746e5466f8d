//! Status poller: the repeating timer that asks the server for job state.
//!
//! Each tick re-arms the timer at the current interval and dispatches one
//! status request, unless the previous one is still outstanding, in which case
//! the tick is skipped. Responses come back to the controller as events tagged
//! with the generation they were issued under.

mod classify;
mod policy;

pub use classify::classify;
pub use policy::{ErrorKind, HaltReason, PollDecision, PollPolicy};

use std::sync::Arc;
use std::time::Duration;

use crate::api::ScanApi;
use crate::error::ScanError;
use crate::job::JobId;
use crate::lifecycle::{Event, EventSender};
use crate::scheduler::{Scheduler, TimerHandle};

/// Aborts the outstanding status request when dropped.
pub(crate) struct RequestGuard(tokio::task::JoinHandle<()>);

impl RequestGuard {
    fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Dispatched,
    Skipped,
}

pub(crate) struct StatusPoller {
    policy: PollPolicy,
    scheduler: Arc<dyn Scheduler>,
    events: EventSender,
    generation: u64,
    backed_off: bool,
    consecutive_failures: u32,
    timer: Option<TimerHandle>,
    in_flight: Option<RequestGuard>,
    requests_sent: u64,
    ticks_skipped: u64,
}

impl StatusPoller {
    pub(crate) fn new(
        policy: PollPolicy,
        scheduler: Arc<dyn Scheduler>,
        events: EventSender,
        generation: u64,
    ) -> Self {
        Self {
            policy,
            scheduler,
            events,
            generation,
            backed_off: false,
            consecutive_failures: 0,
            timer: None,
            in_flight: None,
            requests_sent: 0,
            ticks_skipped: 0,
        }
    }

    /// Interval the next tick will be scheduled at.
    pub(crate) fn interval(&self) -> Duration {
        if self.backed_off {
            self.policy.backoff_interval
        } else {
            self.policy.base_interval
        }
    }

    pub(crate) fn is_backed_off(&self) -> bool {
        self.backed_off
    }

    /// Timer armed (polling not stopped).
    pub(crate) fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    pub(crate) fn has_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True when the outstanding request task ended without reporting back.
    pub(crate) fn request_lost(&self) -> bool {
        self.in_flight.as_ref().is_some_and(RequestGuard::is_finished)
    }

    pub(crate) fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    pub(crate) fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped
    }

    /// Arm (or re-arm) the timer at the current interval. Replacing the handle
    /// cancels the previous timer.
    fn arm(&mut self) {
        let events = self.events.clone();
        let generation = self.generation;
        self.timer = Some(self.scheduler.schedule(
            self.interval(),
            Box::new(move || {
                let _ = events.send(Event::PollDue { generation });
            }),
        ));
    }

    /// Handle a tick: re-arm, then dispatch unless a request is outstanding.
    pub(crate) fn tick(&mut self, api: &Arc<dyn ScanApi>, id: &JobId) -> TickOutcome {
        self.arm();
        if self.in_flight.is_some() {
            self.ticks_skipped += 1;
            tracing::debug!(job_id = %id, generation = self.generation, "status request outstanding, skipping tick");
            return TickOutcome::Skipped;
        }
        let api = Arc::clone(api);
        let id = id.clone();
        let events = self.events.clone();
        let generation = self.generation;
        let task = tokio::spawn(async move {
            let result = api.status(&id).await;
            let _ = events.send(Event::StatusArrived { generation, result });
        });
        self.in_flight = Some(RequestGuard(task));
        self.requests_sent += 1;
        TickOutcome::Dispatched
    }

    /// The outstanding request reported back (or was lost).
    pub(crate) fn request_done(&mut self) {
        self.in_flight = None;
    }

    pub(crate) fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Classify a failed poll and ask the policy what to do.
    pub(crate) fn record_error(&mut self, err: &ScanError) -> PollDecision {
        let kind = classify(err);
        if kind == ErrorKind::Transient {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
        self.policy.decide(self.consecutive_failures, kind)
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Switch to the backoff interval and re-arm the pending tick at it.
    /// Returns true only on the first switch (the onset).
    pub(crate) fn enter_backoff(&mut self) -> bool {
        if self.backed_off {
            return false;
        }
        self.backed_off = true;
        if self.timer.is_some() {
            self.arm();
        }
        true
    }

    /// Dispose the timer and abort any outstanding request.
    pub(crate) fn stop(&mut self) {
        self.timer = None;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::testing::ScriptedApi;
    use tokio::sync::mpsc;

    fn poller(sched: &ManualScheduler) -> (StatusPoller, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let policy = PollPolicy {
            base_interval: Duration::from_secs(2),
            backoff_interval: Duration::from_secs(10),
            max_consecutive_failures: 2,
        };
        (StatusPoller::new(policy, Arc::new(sched.clone()), tx, 7), rx)
    }

    #[tokio::test]
    async fn tick_rearms_and_dispatches() {
        let sched = ManualScheduler::new();
        let (mut p, mut rx) = poller(&sched);
        let api: Arc<dyn ScanApi> = Arc::new(ScriptedApi::new());
        assert_eq!(p.tick(&api, &JobId::new("a")), TickOutcome::Dispatched);
        assert!(p.is_active());
        assert_eq!(sched.pending(), 1);
        match rx.recv().await {
            Some(Event::StatusArrived { generation, .. }) => assert_eq!(generation, 7),
            other => panic!("expected status event, got {other:?}"),
        }
        sched.advance(Duration::from_secs(2));
        assert!(matches!(rx.try_recv(), Ok(Event::PollDue { generation: 7 })));
    }

    #[tokio::test]
    async fn tick_skipped_while_request_outstanding() {
        let sched = ManualScheduler::new();
        let (mut p, _rx) = poller(&sched);
        let scripted = Arc::new(ScriptedApi::new());
        scripted.hold_status();
        let api: Arc<dyn ScanApi> = scripted.clone();
        assert_eq!(p.tick(&api, &JobId::new("a")), TickOutcome::Dispatched);
        assert_eq!(p.tick(&api, &JobId::new("a")), TickOutcome::Skipped);
        assert_eq!(p.requests_sent(), 1);
        assert_eq!(p.ticks_skipped(), 1);
    }

    #[tokio::test]
    async fn backoff_onset_reported_once_and_rearms() {
        let sched = ManualScheduler::new();
        let (mut p, _rx) = poller(&sched);
        let api: Arc<dyn ScanApi> = Arc::new(ScriptedApi::new());
        p.tick(&api, &JobId::new("a"));
        assert_eq!(sched.next_deadline_in(), Some(Duration::from_secs(2)));
        assert!(p.enter_backoff());
        assert!(!p.enter_backoff());
        assert_eq!(p.interval(), Duration::from_secs(10));
        assert_eq!(sched.next_deadline_in(), Some(Duration::from_secs(10)));
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn failures_reset_on_success() {
        let sched = ManualScheduler::new();
        let (mut p, _rx) = poller(&sched);
        let err = ScanError::Server(500);
        assert_eq!(p.record_error(&err), PollDecision::Retry);
        p.record_success();
        assert_eq!(p.record_error(&err), PollDecision::Retry);
        assert_eq!(
            p.record_error(&err),
            PollDecision::Halt(HaltReason::TooManyFailures)
        );
        // Rate limiting neither counts nor resets.
        assert_eq!(p.record_error(&ScanError::RateLimited), PollDecision::BackOff);
        assert_eq!(p.consecutive_failures(), 2);
    }

    #[tokio::test]
    async fn stop_disarms_timer() {
        let sched = ManualScheduler::new();
        let (mut p, _rx) = poller(&sched);
        let api: Arc<dyn ScanApi> = Arc::new(ScriptedApi::new());
        p.tick(&api, &JobId::new("a"));
        p.stop();
        assert!(!p.is_active());
        assert!(!p.has_request_in_flight());
        assert_eq!(sched.pending(), 0);
    }
}
