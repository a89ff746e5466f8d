//! Job submission: validate intent, send the start request, build the job.

use std::sync::Arc;

use crate::api::{ScanApi, StartRequest};
use crate::error::ScanError;
use crate::job::{ScanJob, ScanOptions};
use crate::scheduler::Clock;

/// Check that `target` is an absolute http(s) URL with a host.
pub fn validate_target(target: &str) -> Result<url::Url, ScanError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(ScanError::Validation("target URL is empty".into()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ScanError::Validation(format!("invalid target URL {trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScanError::Validation(format!(
            "target URL must use http or https (got {})",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ScanError::Validation(format!("target URL has no host: {trimmed}")));
    }
    Ok(parsed)
}

/// Sends start requests and turns accepted ones into pending [`ScanJob`]s.
pub struct JobSubmitter {
    api: Arc<dyn ScanApi>,
    clock: Arc<dyn Clock>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn ScanApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    /// Validate and submit. Nothing is sent when validation fails.
    pub async fn submit(&self, target: &str, options: ScanOptions) -> Result<ScanJob, ScanError> {
        let url = validate_target(target)?;
        if !options.any_enabled() {
            return Err(ScanError::Validation("select at least one check".into()));
        }
        let request = StartRequest::new(url.as_str(), options);
        let id = self.api.start(&request).await?;
        tracing::info!(job_id = %id, url = %url, depth = options.depth.tier(), "scan submitted");
        Ok(ScanJob::new(id, url.to_string(), options, self.clock.now()))
    }
}
