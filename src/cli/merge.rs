//! Merge command - keep a PR up to date and merge it when green

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, hyperlink};
use anstream::println;
use dialoguer::Confirm;
use mergeit::error::{Error, Result};
use mergeit::merge::{MergeOptions, MergeOrchestrator, MergeOutcome, NoopProgress};
use mergeit::types::MergeMethod;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Options for the merge command
#[derive(Debug, Clone, Default)]
pub struct MergeCommandOptions {
    /// Full PR/MR URL
    pub pr_url: String,
    /// Merge method as typed by the user
    pub method: Option<String>,
    /// Override for the retry interval
    pub retry_interval: Option<Duration>,
    /// Override for the retry limit
    pub max_retries: Option<u32>,
    /// Override for the overall timeout
    pub timeout: Option<Duration>,
    /// Observe once and print the decision without acting
    pub dry_run: bool,
    /// Prompt for confirmation before starting
    pub confirm: bool,
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Print every observation
    pub verbose: bool,
}

/// Run the merge command
///
/// Returns `None` when nothing was attempted (dry run or aborted).
pub async fn run_merge(options: MergeCommandOptions) -> Result<Option<MergeOutcome>> {
    // Validate the method before anything touches the network
    let method = options
        .method
        .as_deref()
        .map(str::parse::<MergeMethod>)
        .transpose()?;

    let ctx = CommandContext::new(&options.pr_url, options.config.as_deref())?;
    let merge_options = resolve_options(&ctx, &options, method);
    debug!(
        platform = %ctx.platform_config.platform,
        host = ?ctx.platform_config.host,
        ?merge_options,
        "resolved merge options"
    );

    println!(
        "{} {} {}",
        "Merging".emphasis(),
        ctx.pr.to_string().accent(),
        format!("({})", hyperlink(&options.pr_url, &options.pr_url)).muted()
    );

    if options.dry_run {
        let orchestrator = MergeOrchestrator::new(ctx.source.as_ref(), &NoopProgress, merge_options);
        let (observation, decision) = orchestrator.preview(&ctx.pr).await?;
        println!(
            "  {} {} / build {} at {}",
            "State:".emphasis(),
            observation.mergeability.accent(),
            observation.build.accent(),
            observation.short_sha()
        );
        println!("  {} {}", "Would:".emphasis(), decision);
        println!();
        println!("{}", "Run without --dry-run to execute.".muted());
        return Ok(None);
    }

    if options.confirm {
        let prompt = format!(
            "Merge {} with the \"{}\" method once ready?",
            ctx.pr, merge_options.method
        );
        if !Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(None);
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let progress = CliProgress::new(options.verbose);
    let orchestrator = MergeOrchestrator::new(ctx.source.as_ref(), &progress, merge_options);
    let outcome = orchestrator.run(&ctx.pr, &cancel).await;
    ctrl_c.abort();

    println!();
    match &outcome {
        MergeOutcome::Success => println!("{} successfully merged.", options.pr_url.success()),
        MergeOutcome::Fail(reason) => println!(
            "{} {}: {reason}",
            "Error merging".warn(),
            options.pr_url
        ),
    }

    Ok(Some(outcome))
}

/// Config file values overridden by command-line flags
fn resolve_options(
    ctx: &CommandContext,
    options: &MergeCommandOptions,
    method: Option<MergeMethod>,
) -> MergeOptions {
    let defaults = ctx.config.merge_options();
    MergeOptions {
        method: method.unwrap_or(defaults.method),
        retry_interval: options.retry_interval.unwrap_or(defaults.retry_interval),
        max_retries: options.max_retries.or(defaults.max_retries),
        timeout: options.timeout.or(defaults.timeout),
    }
}
