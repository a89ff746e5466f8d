//! Identifiers and submission options for scan jobs.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Opaque job identifier assigned by the scan service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Scan depth tier (1–3) sent alongside the check toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ScanDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl ScanDepth {
    pub fn tier(self) -> u8 {
        match self {
            ScanDepth::Quick => 1,
            ScanDepth::Standard => 2,
            ScanDepth::Deep => 3,
        }
    }
}

impl From<ScanDepth> for u8 {
    fn from(d: ScanDepth) -> u8 {
        d.tier()
    }
}

impl TryFrom<u8> for ScanDepth {
    type Error = ScanError;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        match tier {
            1 => Ok(ScanDepth::Quick),
            2 => Ok(ScanDepth::Standard),
            3 => Ok(ScanDepth::Deep),
            other => Err(ScanError::Validation(format!(
                "scan depth must be 1, 2 or 3 (got {other})"
            ))),
        }
    }
}

/// The named checks a scan can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Certificate,
    Headers,
    Ports,
    Vulnerabilities,
    Content,
    Performance,
}

impl Check {
    pub const ALL: [Check; 6] = [
        Check::Certificate,
        Check::Headers,
        Check::Ports,
        Check::Vulnerabilities,
        Check::Content,
        Check::Performance,
    ];
}

/// Requested checks and depth, fixed at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    pub certificate_analysis: bool,
    pub header_analysis: bool,
    pub port_scan: bool,
    pub vulnerability_detection: bool,
    pub content_analysis: bool,
    pub performance_check: bool,
    #[serde(skip)]
    pub depth: ScanDepth,
}

impl ScanOptions {
    /// Every check enabled at the given depth.
    pub fn all(depth: ScanDepth) -> Self {
        Self::from_checks(&Check::ALL, depth)
    }

    /// Nothing enabled; not submittable until at least one check is turned on.
    pub fn none(depth: ScanDepth) -> Self {
        Self::from_checks(&[], depth)
    }

    pub fn from_checks(checks: &[Check], depth: ScanDepth) -> Self {
        let mut opts = Self {
            certificate_analysis: false,
            header_analysis: false,
            port_scan: false,
            vulnerability_detection: false,
            content_analysis: false,
            performance_check: false,
            depth,
        };
        for check in checks {
            opts.set(*check, true);
        }
        opts
    }

    pub fn set(&mut self, check: Check, enabled: bool) {
        let slot = match check {
            Check::Certificate => &mut self.certificate_analysis,
            Check::Headers => &mut self.header_analysis,
            Check::Ports => &mut self.port_scan,
            Check::Vulnerabilities => &mut self.vulnerability_detection,
            Check::Content => &mut self.content_analysis,
            Check::Performance => &mut self.performance_check,
        };
        *slot = enabled;
    }

    pub fn is_enabled(&self, check: Check) -> bool {
        match check {
            Check::Certificate => self.certificate_analysis,
            Check::Headers => self.header_analysis,
            Check::Ports => self.port_scan,
            Check::Vulnerabilities => self.vulnerability_detection,
            Check::Content => self.content_analysis,
            Check::Performance => self.performance_check,
        }
    }

    pub fn any_enabled(&self) -> bool {
        Check::ALL.iter().any(|c| self.is_enabled(*c))
    }
}

/// Per-severity finding counts from the status `summary.findings` object.
///
/// Counts that are null, negative or not numbers decode as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    #[serde(default, deserialize_with = "lenient_count")]
    pub critical: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub high: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub medium: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub low: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub info: u32,
    /// Severities we do not model explicitly. Non-numeric entries are ignored.
    #[serde(flatten)]
    pub other: std::collections::BTreeMap<String, serde_json::Value>,
}

/// Keys some servers add next to the severities; they repeat the sum.
const AGGREGATE_KEYS: [&str; 3] = ["total", "count", "sum"];

impl FindingsSummary {
    pub fn total(&self) -> u32 {
        let named = [self.critical, self.high, self.medium, self.low, self.info]
            .into_iter()
            .fold(0u32, u32::saturating_add);
        self.other
            .iter()
            .filter(|(key, _)| !AGGREGATE_KEYS.contains(&key.to_ascii_lowercase().as_str()))
            .filter_map(|(_, v)| count_of(v))
            .fold(named, u32::saturating_add)
    }
}

fn count_of(value: &serde_json::Value) -> Option<u32> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    Some(n.min(u32::MAX as u64) as u32)
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(count_of(&value).unwrap_or(0))
}
