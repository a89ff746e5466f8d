//! Request/response bodies of the scan service, decoded leniently.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::job::{FindingsSummary, JobId, ScanDepth, ScanOptions};

/// Body of `POST /scans`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub target_url: String,
    pub options: ScanOptions,
    pub depth: ScanDepth,
}

impl StartRequest {
    pub fn new(target_url: impl Into<String>, options: ScanOptions) -> Self {
        Self {
            target_url: target_url.into(),
            depth: options.depth,
            options,
        }
    }
}

/// Reply to `POST /scans`. The id may come back as a string or a number.
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

impl StartResponse {
    pub fn job_id(&self) -> JobId {
        JobId::new(self.id.clone())
    }
}

/// Reply to `GET /scans/{id}`. Every field is optional; types the server gets
/// wrong are treated as absent rather than failing the whole poll.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub progress: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub estimated_completion_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub issues: Option<Vec<serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub summary: Option<StatusSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusSummary {
    #[serde(default, deserialize_with = "lenient_object")]
    pub findings: Option<FindingsSummary>,
}

impl StatusResponse {
    /// Shorthand for a bare `{"status": ...}` reply.
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    /// Parsed `estimatedCompletionTime`. RFC 3339, or a naive ISO 8601
    /// timestamp taken as UTC; anything else is logged and ignored.
    pub fn estimated_completion_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.estimated_completion_time.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        tracing::warn!(raw, "unparseable estimatedCompletionTime, ignoring");
        None
    }

    pub fn findings(&self) -> Option<FindingsSummary> {
        self.summary.as_ref().and_then(|s| s.findings.clone())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    match IdValue::deserialize(deserializer)? {
        IdValue::Text(s) => Ok(s),
        IdValue::Unsigned(n) => Ok(n.to_string()),
        IdValue::Signed(n) => Ok(n.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<serde_json::Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Null => None,
        other => {
            tracing::debug!(%other, "issues is not a list, ignoring");
            None
        }
    })
}

/// Decodes `T` from the raw value, or `None` if it has the wrong shape.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(err) => {
            tracing::debug!(%err, "malformed status field, ignoring");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_wire_shape() {
        let req = StartRequest::new("https://example.com", ScanOptions::all(ScanDepth::Standard));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["targetUrl"], "https://example.com");
        assert_eq!(json["depth"], 2);
        assert_eq!(json["options"]["certificateAnalysis"], true);
        assert_eq!(json["options"]["performanceCheck"], true);
        assert!(json["options"].get("depth").is_none());
    }

    #[test]
    fn start_response_accepts_numeric_id() {
        let r: StartResponse = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(r.job_id(), JobId::new("42"));
        let r: StartResponse = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(r.id, "abc");
    }

    #[test]
    fn status_response_full() {
        let r: StatusResponse = serde_json::from_str(
            r#"{
                "status": "IN_PROGRESS",
                "progress": 40,
                "estimatedCompletionTime": "2030-01-01T00:10:00Z",
                "summary": {"findings": {"critical": 1, "high": 2, "medium": 3, "note": "x"}}
            }"#,
        )
        .unwrap();
        assert_eq!(r.status.as_deref(), Some("IN_PROGRESS"));
        assert_eq!(r.progress, Some(40.0));
        assert_eq!(
            r.estimated_completion_at().unwrap().to_rfc3339(),
            "2030-01-01T00:10:00+00:00"
        );
        assert_eq!(r.findings().unwrap().total(), 6);
        assert!(r.issues.is_none());
    }

    #[test]
    fn status_response_lenient_fields() {
        let r: StatusResponse =
            serde_json::from_str(r#"{"status": null, "progress": "55.5"}"#).unwrap();
        assert_eq!(r.status, None);
        assert_eq!(r.progress, Some(55.5));

        let r: StatusResponse =
            serde_json::from_str(r#"{"status": 3, "progress": "soon", "estimatedCompletionTime": "later"}"#)
                .unwrap();
        assert_eq!(r.status.as_deref(), Some("3"));
        assert_eq!(r.progress, None);
        assert_eq!(r.estimated_completion_at(), None);

        let r: StatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(r, StatusResponse::default());
    }

    #[test]
    fn malformed_issues_and_summary_keep_status() {
        let r: StatusResponse = serde_json::from_str(
            r#"{"status": "completed", "summary": {"findings": {"critical": null, "high": "2"}}}"#,
        )
        .unwrap();
        assert_eq!(r.status.as_deref(), Some("completed"));
        assert_eq!(r.findings().unwrap().total(), 2);

        let r: StatusResponse =
            serde_json::from_str(r#"{"status": "completed", "issues": {"count": 3}}"#).unwrap();
        assert_eq!(r.status.as_deref(), Some("completed"));
        assert_eq!(r.issues, None);

        let r: StatusResponse = serde_json::from_str(
            r#"{"status": "completed", "issues": [{"id": 1}], "summary": "n/a"}"#,
        )
        .unwrap();
        assert_eq!(r.issues.map(|i| i.len()), Some(1));
        assert_eq!(r.summary, None);

        let r: StatusResponse =
            serde_json::from_str(r#"{"status": "completed", "summary": {"findings": "none"}}"#)
                .unwrap();
        assert_eq!(r.summary, Some(StatusSummary::default()));
        assert_eq!(r.findings(), None);
    }

    #[test]
    fn naive_timestamp_is_utc() {
        let r = StatusResponse {
            estimated_completion_time: Some("2030-01-01T00:10:00.250".into()),
            ..Default::default()
        };
        assert_eq!(
            r.estimated_completion_at().unwrap().to_rfc3339(),
            "2030-01-01T00:10:00.250+00:00"
        );
    }
}
