//! CLI for the scanwatch scan-job orchestrator.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scanwatch_core::api::{CurlScanApi, ScanApi};
use scanwatch_core::config;
use scanwatch_core::credentials::EnvCredentials;
use scanwatch_core::job::Check;
use std::sync::Arc;

use commands::{run_cancel, run_completions, run_man, run_scan, run_status};

/// Top-level CLI for scanwatch.
#[derive(Debug, Parser)]
#[command(name = "scanwatch")]
#[command(about = "scanwatch: submit and follow website security scans", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Check names accepted by `--checks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckArg {
    Certificate,
    Headers,
    Ports,
    Vulnerabilities,
    Content,
    Performance,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::Certificate => Check::Certificate,
            CheckArg::Headers => Check::Headers,
            CheckArg::Ports => Check::Ports,
            CheckArg::Vulnerabilities => Check::Vulnerabilities,
            CheckArg::Content => Check::Content,
            CheckArg::Performance => Check::Performance,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Submit a scan and follow it until it finishes. Ctrl-C cancels it.
    Scan {
        /// Absolute http(s) URL of the site to scan.
        url: String,
        /// Scan depth: 1 quick, 2 standard, 3 deep.
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=3))]
        depth: u8,
        /// Comma-separated checks to run (default: all).
        #[arg(long, value_enum, value_delimiter = ',', value_name = "CHECK,...")]
        checks: Vec<CheckArg>,
    },

    /// Fetch the current status of a scan once.
    Status {
        /// Scan job identifier.
        id: String,
    },

    /// Cancel a scan.
    Cancel {
        /// Scan job identifier.
        id: String,
        /// Try a privileged cancel first, then an ordinary one.
        #[arg(long)]
        force: bool,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print the man page to stdout.
    Man,
}

fn scan_api(cfg: &config::ScanwatchConfig) -> Result<Arc<dyn ScanApi>> {
    let credentials = Arc::new(EnvCredentials::new(cfg.api.token_env.clone()));
    let api = CurlScanApi::from_config(&cfg.api, credentials)
        .with_context(|| format!("scan service at {}", cfg.api.base_url))?;
    Ok(Arc::new(api))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell),
            CliCommand::Man => return run_man(),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let api = scan_api(&cfg)?;

        match cli.command {
            CliCommand::Scan { url, depth, checks } => {
                let checks: Vec<Check> = checks.into_iter().map(Check::from).collect();
                run_scan(&cfg, api, &url, depth, &checks).await?;
            }
            CliCommand::Status { id } => run_status(api.as_ref(), &id).await?,
            CliCommand::Cancel { id, force } => run_cancel(api.as_ref(), &id, force).await?,
            CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
