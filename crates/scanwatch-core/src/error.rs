//! Error taxonomy shared by submission, polling and cancellation.

use crate::job::JobId;

/// Typed failure of an interaction with the scan service (or of a request
/// rejected before it reached the service).
///
/// Kept `Clone` so the controller can hand the same error to the caller and
/// to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Malformed target URL or no checks selected. Never retried.
    #[error("invalid scan request: {0}")]
    Validation(String),
    /// Missing or rejected credential (no token, HTTP 401/403).
    #[error("not authorized{}", http_suffix(.status))]
    Auth { status: Option<u16> },
    /// Server asked us to slow down (HTTP 429).
    #[error("rate limited by the scan service")]
    RateLimited,
    /// Job id unknown to the server (HTTP 404).
    #[error("scan job not found")]
    NotFound,
    /// Transport-level failure (DNS, connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),
    /// HTTP 5xx.
    #[error("scan service error (HTTP {0})")]
    Server(u16),
    /// Unexpected status code or a body we could not decode.
    #[error("unexpected response from scan service: {0}")]
    Protocol(String),
    /// A scan is already being polled in this controller.
    #[error("a scan is already in progress")]
    Busy,
    /// The id does not name the controller's current job.
    #[error("no active scan job with id {0}")]
    NoSuchJob(JobId),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl ScanError {
    /// Map an HTTP status code to an error. Only call for non-2xx codes.
    pub fn from_http_status(code: u32) -> Self {
        match code {
            401 | 403 => ScanError::Auth {
                status: Some(code as u16),
            },
            404 => ScanError::NotFound,
            429 => ScanError::RateLimited,
            500..=599 => ScanError::Server(code as u16),
            _ => ScanError::Protocol(format!("HTTP {code}")),
        }
    }
}
