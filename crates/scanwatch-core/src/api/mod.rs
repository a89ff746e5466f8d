//! Scan service REST boundary.
//!
//! [`ScanApi`] is the seam the orchestrator talks through; [`CurlScanApi`]
//! implements it over HTTP with libcurl. Tests substitute scripted fakes.

mod http;
mod wire;

pub use http::CurlScanApi;
pub use wire::{StartRequest, StartResponse, StatusResponse, StatusSummary};

use async_trait::async_trait;

use crate::error::ScanError;
use crate::job::JobId;

/// Operations the orchestrator consumes from the scan service.
#[async_trait]
pub trait ScanApi: Send + Sync {
    /// `POST start(targetUrl, options, depth) -> { id }`.
    async fn start(&self, request: &StartRequest) -> Result<JobId, ScanError>;

    /// `GET status(id)`.
    async fn status(&self, id: &JobId) -> Result<StatusResponse, ScanError>;

    /// `DELETE cancel(id, force?)`.
    async fn cancel(&self, id: &JobId, force: bool) -> Result<(), ScanError>;
}
