//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::api::{ScanApi, StartRequest, StatusResponse};
use crate::error::ScanError;
use crate::job::JobId;
use crate::notify::{Notification, NotificationKind, NotificationSink, Severity};

/// Scan API fake. Status replies are consumed in order; the last one repeats.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    starts: Mutex<VecDeque<Result<JobId, ScanError>>>,
    statuses: Mutex<VecDeque<Result<StatusResponse, ScanError>>>,
    cancels: Mutex<VecDeque<Result<(), ScanError>>>,
    start_requests: Mutex<Vec<StartRequest>>,
    status_calls: Mutex<Vec<JobId>>,
    cancel_calls: Mutex<Vec<(JobId, bool)>>,
    status_gate: Mutex<Option<Arc<Semaphore>>>,
    next_id: Mutex<u32>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_start(&self, reply: Result<JobId, ScanError>) {
        self.starts.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_status(&self, reply: Result<StatusResponse, ScanError>) {
        self.statuses.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_statuses<I>(&self, replies: I)
    where
        I: IntoIterator<Item = Result<StatusResponse, ScanError>>,
    {
        self.statuses.lock().unwrap().extend(replies);
    }

    pub(crate) fn push_cancel(&self, reply: Result<(), ScanError>) {
        self.cancels.lock().unwrap().push_back(reply);
    }

    /// Make status calls wait until [`release_status`](Self::release_status).
    pub(crate) fn hold_status(&self) {
        *self.status_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release_status(&self, calls: usize) {
        if let Some(gate) = self.status_gate.lock().unwrap().as_ref() {
            gate.add_permits(calls);
        }
    }

    pub(crate) fn start_requests(&self) -> Vec<StartRequest> {
        self.start_requests.lock().unwrap().clone()
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    pub(crate) fn cancel_calls(&self) -> Vec<(JobId, bool)> {
        self.cancel_calls.lock().unwrap().clone()
    }
}

fn status_reply(
    label: &str,
    progress: Option<f64>,
) -> Result<StatusResponse, ScanError> {
    Ok(StatusResponse {
        progress,
        ..StatusResponse::with_status(label)
    })
}

/// `Ok({"status": label})`.
pub(crate) fn reply(label: &str) -> Result<StatusResponse, ScanError> {
    status_reply(label, None)
}

/// `Ok({"status": label, "progress": progress})`.
pub(crate) fn reply_with_progress(label: &str, progress: f64) -> Result<StatusResponse, ScanError> {
    status_reply(label, Some(progress))
}

#[async_trait]
impl ScanApi for ScriptedApi {
    async fn start(&self, request: &StartRequest) -> Result<JobId, ScanError> {
        self.start_requests.lock().unwrap().push(request.clone());
        if let Some(reply) = self.starts.lock().unwrap().pop_front() {
            return reply;
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(JobId::new(format!("job-{}", *next)))
    }

    async fn status(&self, id: &JobId) -> Result<StatusResponse, ScanError> {
        self.status_calls.lock().unwrap().push(id.clone());
        let gate = self.status_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.len() {
            0 => reply("pending"),
            1 => statuses[0].clone(),
            _ => statuses.pop_front().unwrap_or_else(|| reply("pending")),
        }
    }

    async fn cancel(&self, id: &JobId, force: bool) -> Result<(), ScanError> {
        self.cancel_calls.lock().unwrap().push((id.clone(), force));
        self.cancels.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Sink that keeps every notification.
#[derive(Default)]
pub(crate) struct RecordingSink {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub(crate) fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.all().into_iter().filter(|n| n.kind == kind).collect()
    }

    pub(crate) fn count(&self, kind: NotificationKind) -> usize {
        self.of_kind(kind).len()
    }

    pub(crate) fn count_severity(&self, severity: Severity) -> usize {
        self.all().into_iter().filter(|n| n.severity == severity).count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}
