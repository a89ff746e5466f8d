//! `scanwatch scan <url>` – submit a scan and follow it until it finishes.

use anyhow::{bail, Result};
use scanwatch_core::api::ScanApi;
use scanwatch_core::config::ScanwatchConfig;
use scanwatch_core::job::{Check, ScanDepth, ScanOptions};
use scanwatch_core::lifecycle::{
    CallToAction, CancelOutcome, ControllerState, JobSnapshot, LifecycleController,
};
use scanwatch_core::notify::{ChannelSink, Notification};
use scanwatch_core::progress::format_duration;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn options_for(depth: u8, checks: &[Check]) -> Result<ScanOptions> {
    let depth = ScanDepth::try_from(depth)?;
    Ok(if checks.is_empty() {
        ScanOptions::all(depth)
    } else {
        ScanOptions::from_checks(checks, depth)
    })
}

/// One status line; printed only when it changes.
fn progress_line(snapshot: &JobSnapshot) -> Option<String> {
    let job = snapshot.job.as_ref()?;
    let mut line = format!(
        "[{}] {:>3}%  elapsed {}",
        job.status(),
        job.progress_percent(),
        format_duration(snapshot.elapsed)
    );
    if let Some(eta) = snapshot.eta {
        line.push_str(&format!("  {eta}"));
    }
    if snapshot.rate_limited {
        line.push_str("  (slowed down)");
    }
    Some(line)
}

fn drain_notifications(rx: &mut UnboundedReceiver<Notification>) {
    while let Ok(n) = rx.try_recv() {
        println!("{n}");
    }
}

pub async fn run_scan(
    cfg: &ScanwatchConfig,
    api: Arc<dyn ScanApi>,
    url: &str,
    depth: u8,
    checks: &[Check],
) -> Result<()> {
    let options = options_for(depth, checks)?;
    let (sink, mut notes) = ChannelSink::new();
    let mut ctl = LifecycleController::with_tokio(api, Arc::new(sink), cfg.poll_policy())
        .with_stuck_policy(cfg.stuck_policy());

    let submitted = ctl.submit(url, options).await;
    drain_notifications(&mut notes);
    let id = submitted?;
    println!("Scan {id} submitted");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_line = None;
    let mut stuck_hint_shown = false;
    loop {
        drain_notifications(&mut notes);
        let snapshot = ctl.snapshot();
        let line = progress_line(&snapshot);
        if line.is_some() && line != last_line {
            if let Some(l) = &line {
                println!("{l}");
            }
            last_line = line;
        }
        if snapshot.recovery_available && !stuck_hint_shown && ctl.is_stuck() {
            println!("Scan {id} looks stuck; `scanwatch cancel {id} --force` resets it");
            stuck_hint_shown = true;
        }
        if ctl.state() != ControllerState::Polling {
            break;
        }
        let interrupted = tokio::select! {
            _ = &mut ctrl_c => true,
            _ = ctl.step() => false,
        };
        if interrupted {
            println!("Interrupted, cancelling scan {id}");
            let outcome = ctl.cancel(&id).await;
            drain_notifications(&mut notes);
            match outcome {
                Ok(CancelOutcome::AlreadyTerminal(status)) => {
                    println!("Scan {id} had already finished ({status})");
                }
                Ok(_) => {}
                Err(err) => bail!("scan {id} may still be running: {err}"),
            }
            break;
        }
    }
    drain_notifications(&mut notes);

    let snapshot = ctl.snapshot();
    match (snapshot.state, snapshot.call_to_action) {
        (ControllerState::Terminal(_), Some(CallToAction::ViewResults)) => {
            if let Some(f) = snapshot.job.as_ref().and_then(|j| j.findings()) {
                println!(
                    "Findings: {} critical, {} high, {} medium, {} low, {} info",
                    f.critical, f.high, f.medium, f.low, f.info
                );
            }
            Ok(())
        }
        (ControllerState::Terminal(status), Some(CallToAction::Retry)) => {
            bail!("scan {id} {status}; run `scanwatch scan {url}` to try again")
        }
        (ControllerState::Halted(reason), _) => {
            bail!("stopped following scan {id} ({reason:?}); `scanwatch status {id}` checks it")
        }
        _ => Ok(()),
    }
}
