//! Classify scan service errors into poll error kinds.

use super::policy::ErrorKind;
use crate::error::ScanError;

/// Classify a failed status poll for the poll policy.
pub fn classify(err: &ScanError) -> ErrorKind {
    match err {
        ScanError::RateLimited => ErrorKind::RateLimited,
        ScanError::Auth { .. } => ErrorKind::Auth,
        ScanError::NotFound => ErrorKind::NotFound,
        ScanError::Network(_)
        | ScanError::Server(_)
        | ScanError::Protocol(_)
        | ScanError::Validation(_)
        | ScanError::Busy
        | ScanError::NoSuchJob(_) => ErrorKind::Transient,
    }
}
