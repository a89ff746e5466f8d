use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::lifecycle::StuckPolicy;
use crate::poller::PollPolicy;

/// Scan service endpoint and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root; jobs live under `{base_url}/scans`.
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            token_env: "SCANWATCH_TOKEN".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Status polling intervals (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval while the job is pending or running.
    pub base_interval_ms: u64,
    /// Interval after the server rate limits us. Never below the base interval.
    pub backoff_interval_ms: u64,
    /// Consecutive transient poll failures before polling halts.
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 3000,
            backoff_interval_ms: 15000,
            max_consecutive_failures: 5,
        }
    }
}

/// When a running job near completion counts as stuck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StuckConfig {
    pub progress_percent: u8,
    pub after_secs: u64,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            progress_percent: 95,
            after_secs: 300,
        }
    }
}

/// Global configuration loaded from `~/.config/scanwatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanwatchConfig {
    pub api: ApiConfig,
    /// Optional polling section; if missing, built-in defaults are used.
    #[serde(default)]
    pub poll: Option<PollConfig>,
    /// Optional stuck-job heuristic; if missing, built-in defaults are used.
    #[serde(default)]
    pub stuck: Option<StuckConfig>,
}

impl ScanwatchConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll.as_ref().map(PollPolicy::from).unwrap_or_default()
    }

    pub fn stuck_policy(&self) -> StuckPolicy {
        self.stuck.as_ref().map(StuckPolicy::from).unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("scanwatch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ScanwatchConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<ScanwatchConfig> {
    if !path.exists() {
        let default_cfg = ScanwatchConfig {
            poll: Some(PollConfig::default()),
            stuck: Some(StuckConfig::default()),
            ..ScanwatchConfig::default()
        };
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScanwatchConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
