//! `scanwatch status <id>` – fetch one status report and print it normalized.

use anyhow::{Context, Result};
use chrono::Utc;
use scanwatch_core::api::ScanApi;
use scanwatch_core::job::JobId;
use scanwatch_core::progress;
use scanwatch_core::status;

pub async fn run_status(api: &dyn ScanApi, id: &str) -> Result<()> {
    let id = JobId::new(id);
    let reply = api
        .status(&id)
        .await
        .with_context(|| format!("fetch status of scan {id}"))?;
    let canonical = status::normalize(reply.status.as_deref());
    let estimate = progress::estimate_from(
        canonical,
        reply.progress,
        reply.estimated_completion_at(),
        Utc::now(),
    );

    println!("{:<10} {:<10} {:<5} {}", "ID", "STATUS", "PCT", "DETAIL");
    let detail = match (&estimate.eta, reply.status.as_deref()) {
        (Some(eta), _) => eta.to_string(),
        (None, Some(raw)) => format!("server says {raw:?}"),
        (None, None) => "-".to_string(),
    };
    println!(
        "{:<10} {:<10} {:<5} {}",
        id.as_str(),
        canonical.as_str(),
        format!("{}%", estimate.percent),
        detail
    );
    if let Some(issues) = reply.issues.as_ref() {
        println!("Issues: {}", issues.len());
    }
    if let Some(f) = reply.findings() {
        println!(
            "Findings: {} critical, {} high, {} medium, {} low, {} info",
            f.critical, f.high, f.medium, f.low, f.info
        );
    }
    Ok(())
}
