//! libcurl-backed [`ScanApi`].
//!
//! Each call builds a fresh `Easy` handle and runs it on the blocking pool,
//! so the controller task is never blocked on the network.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::wire::{StartRequest, StartResponse, StatusResponse};
use super::ScanApi;
use crate::config::ApiConfig;
use crate::credentials::CredentialSource;
use crate::error::ScanError;
use crate::job::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Delete,
}

/// One request, owned so it can move onto the blocking pool.
struct HttpRequest {
    method: Method,
    url: Url,
    token: String,
    body: Option<Vec<u8>>,
    connect_timeout: Duration,
    timeout: Duration,
}

/// Scan service client over HTTP(S).
pub struct CurlScanApi {
    base: Url,
    credentials: Arc<dyn CredentialSource>,
    connect_timeout: Duration,
    timeout: Duration,
}

impl CurlScanApi {
    /// `base_url` is the API root; jobs live under `{base_url}/scans`.
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialSource>) -> Result<Self, ScanError> {
        let base = Url::parse(base_url)
            .map_err(|e| ScanError::Validation(format!("invalid API base URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ScanError::Validation(format!(
                "API base URL must be http(s): {base_url}"
            )));
        }
        Ok(Self {
            base,
            credentials,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        })
    }

    pub fn from_config(cfg: &ApiConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self, ScanError> {
        Ok(Self::new(&cfg.base_url, credentials)?.with_timeouts(
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.request_timeout_secs),
        ))
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.timeout = timeout;
        self
    }

    /// `{base}/scans` or `{base}/scans/{id}`.
    fn scans_url(&self, id: Option<&JobId>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("scans");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }

    async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Vec<u8>, ScanError> {
        let Some(token) = self.credentials.bearer_token() else {
            tracing::warn!(%url, "no credential available, not sending request");
            return Err(ScanError::Auth { status: None });
        };
        let request = HttpRequest {
            method,
            url,
            token,
            body,
            connect_timeout: self.connect_timeout,
            timeout: self.timeout,
        };
        let (code, body) = tokio::task::spawn_blocking(move || perform(request))
            .await
            .map_err(|e| ScanError::Network(format!("request task failed: {e}")))?
            .map_err(|e| ScanError::Network(e.to_string()))?;
        if (200..300).contains(&code) {
            Ok(body)
        } else {
            tracing::debug!(code, ?method, "scan service returned error status");
            Err(ScanError::from_http_status(code))
        }
    }
}

impl std::fmt::Debug for CurlScanApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurlScanApi")
            .field("base", &self.base.as_str())
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Runs on the blocking pool. Returns the status code and raw body.
fn perform(req: HttpRequest) -> Result<(u32, Vec<u8>), curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(req.url.as_str())?;
    easy.connect_timeout(req.connect_timeout)?;
    easy.timeout(req.timeout)?;

    let mut headers = curl::easy::List::new();
    headers.append("Accept: application/json")?;
    headers.append(&format!("Authorization: Bearer {}", req.token))?;
    match req.method {
        Method::Get => easy.get(true)?,
        Method::Post => {
            easy.post(true)?;
            easy.post_fields_copy(req.body.as_deref().unwrap_or_default())?;
            headers.append("Content-Type: application/json")?;
        }
        Method::Delete => easy.custom_request("DELETE")?,
    }
    easy.http_headers(headers)?;

    let mut response = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    Ok((code, response))
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ScanError> {
    serde_json::from_slice(body).map_err(|e| ScanError::Protocol(format!("invalid JSON body: {e}")))
}

#[async_trait]
impl ScanApi for CurlScanApi {
    async fn start(&self, request: &StartRequest) -> Result<JobId, ScanError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| ScanError::Protocol(format!("encode start request: {e}")))?;
        let reply = self.send(Method::Post, self.scans_url(None), Some(body)).await?;
        let parsed: StartResponse = decode(&reply)?;
        if parsed.id.trim().is_empty() {
            return Err(ScanError::Protocol("start response has an empty id".into()));
        }
        Ok(parsed.job_id())
    }

    async fn status(&self, id: &JobId) -> Result<StatusResponse, ScanError> {
        let reply = self.send(Method::Get, self.scans_url(Some(id)), None).await?;
        decode(&reply)
    }

    async fn cancel(&self, id: &JobId, force: bool) -> Result<(), ScanError> {
        let mut url = self.scans_url(Some(id));
        if force {
            url.query_pairs_mut().append_pair("force", "true");
        }
        self.send(Method::Delete, url, None).await.map(|_| ())
    }
}
