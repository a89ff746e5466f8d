//! `scanwatch cancel <id> [--force]` – ordinary cancel, or the force-reset steps.

use anyhow::{bail, Context, Result};
use scanwatch_core::api::ScanApi;
use scanwatch_core::job::JobId;
use scanwatch_core::lifecycle::{run_steps, RecoveryStep, StepOutcome};

pub async fn run_cancel(api: &dyn ScanApi, id: &str, force: bool) -> Result<()> {
    let id = JobId::new(id);
    if !force {
        api.cancel(&id, false)
            .await
            .with_context(|| format!("cancel scan {id}"))?;
        println!("Cancelled scan {id}");
        return Ok(());
    }

    let report = run_steps(api, &id, &RecoveryStep::FORCE_RESET).await;
    for attempt in &report.attempts {
        match attempt {
            StepOutcome::Succeeded(step) => println!("{step:?}: ok"),
            StepOutcome::Failed(step, err) => println!("{step:?}: {err}"),
        }
    }
    match (report.succeeded_with(), report.final_error()) {
        (Some(RecoveryStep::ForceCancel), _) => println!("Scan {id} was force-reset"),
        (Some(RecoveryStep::Cancel), _) => println!("Cancelled scan {id}"),
        (None, Some(err)) => {
            bail!("could not cancel scan {id} ({err}); check its status and try again")
        }
        (None, None) => bail!("could not cancel scan {id}"),
    }
    Ok(())
}
