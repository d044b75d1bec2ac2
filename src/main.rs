//! mergeit CLI entry point

mod cli;

use anyhow::Context;
use clap::{ArgAction, Parser};
use cli::merge::{MergeCommandOptions, run_merge};
use cli::style::Stylize;
use mergeit::merge::MergeOutcome;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Keep a pull request up to date and merge it once its build is green
#[derive(Parser, Debug)]
#[command(name = "mergeit", version, about, long_about = None)]
struct Cli {
    /// Full pull request (or GitLab merge request) URL
    pr_url: String,

    /// Merge method: merge, squash, or rebase
    method: Option<String>,

    /// Seconds to wait between checks while nothing is actionable
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    retry_interval: Option<u64>,

    /// Give up after this many waits
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Give up once a run has taken this long
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Check the PR once and print what would be done
    #[arg(long)]
    dry_run: bool,

    /// Ask for confirmation before starting
    #[arg(long)]
    confirm: bool,

    /// Config file (defaults to <config dir>/mergeit/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mergeit={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let pr_url = cli.pr_url.clone();
    let options = MergeCommandOptions {
        pr_url: cli.pr_url,
        method: cli.method,
        retry_interval: cli.retry_interval.map(Duration::from_secs),
        max_retries: cli.max_retries,
        timeout: cli.timeout.map(Duration::from_secs),
        dry_run: cli.dry_run,
        confirm: cli.confirm,
        config: cli.config,
        verbose: cli.verbose > 0,
    };

    let outcome = run_merge(options)
        .await
        .with_context(|| format!("could not merge {pr_url}"))?;

    Ok(match outcome {
        None | Some(MergeOutcome::Success) => ExitCode::SUCCESS,
        Some(MergeOutcome::Fail(_)) => ExitCode::FAILURE,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            anstream::eprintln!("{} {e:#}", "error:".warn());
            ExitCode::FAILURE
        }
    }
}
