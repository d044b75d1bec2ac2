//! Merge execution - the effectful observe/decide/act loop
//!
//! `MergeOrchestrator` repeatedly observes a PR through a `StatusSource`,
//! applies the pure [`decide`] policy, and performs at most one write per
//! iteration until the PR is merged or a terminal failure is reached.

use crate::error::{Error, Result};
use crate::merge::decide::{Decision, decide};
use crate::merge::outcome::{FailureReason, MergeOutcome};
use crate::merge::progress::{MergeEvent, ProgressCallback, WaitReason};
use crate::platform::StatusSource;
use crate::types::{
    MergeMessage, MergeMethod, MergeabilityState, Observation, PullRequestRef,
};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default delay between observations when nothing is actionable
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Options for a merge run
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Merge method passed to the platform
    pub method: MergeMethod,
    /// Delay before re-observing when nothing is actionable
    pub retry_interval: Duration,
    /// Maximum number of waits before giving up (None = unbounded)
    pub max_retries: Option<u32>,
    /// Overall time limit for the run (None = unbounded)
    pub timeout: Option<Duration>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            method: MergeMethod::Squash,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_retries: None,
            timeout: None,
        }
    }
}

/// Drives a single PR to merged (or to a terminal failure)
pub struct MergeOrchestrator<'a> {
    source: &'a dyn StatusSource,
    progress: &'a dyn ProgressCallback,
    options: MergeOptions,
}

/// Why observing stopped early
enum Interrupted {
    Cancelled,
    Failed(Error),
}

impl<'a> MergeOrchestrator<'a> {
    /// Create an orchestrator over a status source
    pub fn new(
        source: &'a dyn StatusSource,
        progress: &'a dyn ProgressCallback,
        options: MergeOptions,
    ) -> Self {
        Self {
            source,
            progress,
            options,
        }
    }

    /// Observe once and report what would be done, without writing anything
    pub async fn preview(&self, pr: &PullRequestRef) -> Result<(Observation, Decision)> {
        let state = self.source.fetch_request(pr).await?;
        let build = self.source.fetch_build_status(pr, &state.head_sha).await?;
        let observation = Observation::new(state, build);
        let decision = self.decide(&observation);
        Ok((observation, decision))
    }

    /// Run the merge loop until a terminal outcome
    ///
    /// Cancellation is checked before every platform call and honored during
    /// waits. A branch update or merge already in flight is never
    /// interrupted; cancellation requested meanwhile ends the run afterwards.
    pub async fn run(&self, pr: &PullRequestRef, cancel: &CancellationToken) -> MergeOutcome {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        let mut waits: u32 = 0;
        // Head SHA at which the last branch update was issued
        let mut updated_from: Option<String> = None;

        info!(%pr, method = %self.options.method, "starting merge run");

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(pr).await;
            }

            attempt += 1;
            self.report(MergeEvent::FetchStarted {
                pr: pr.clone(),
                attempt,
            })
            .await;

            let observation = match self.observe(pr, cancel).await {
                Ok(observation) => observation,
                Err(Interrupted::Cancelled) => return self.cancelled(pr).await,
                Err(Interrupted::Failed(e)) => {
                    warn!(%pr, error = %e, "failed to observe PR");
                    return self.fail(FailureReason::Operational(e.to_string())).await;
                }
            };

            let mut decision = self.decide(&observation);

            // A stale `behind` right after our own update gets one wait; if the
            // head is still unchanged after that, the update is issued again.
            let last_update = updated_from.take();
            let update_pending = decision == Decision::UpdateBranch
                && last_update.as_deref() == Some(observation.head_sha.as_str());
            if update_pending {
                debug!(%pr, sha = %observation.head_sha, "branch update not yet reflected");
                decision = Decision::RetryAfter(self.options.retry_interval);
            }

            self.report(MergeEvent::Observed {
                observation: Box::new(observation.clone()),
                decision: decision.clone(),
            })
            .await;

            match decision {
                Decision::Success => {
                    self.report(MergeEvent::Succeeded).await;
                    info!(%pr, attempts = attempt, "PR merged");
                    return MergeOutcome::Success;
                }
                Decision::Fail(reason) => return self.fail(reason).await,
                Decision::RetryAfter(delay) => {
                    if let Some(reason) = self.budget_exceeded(started, waits, delay) {
                        return self.fail(reason).await;
                    }
                    waits += 1;

                    let reason = wait_reason(&observation, update_pending);
                    self.report(MergeEvent::RetryScheduled { delay, reason })
                        .await;

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return self.cancelled(pr).await,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Decision::UpdateBranch => {
                    self.report(MergeEvent::UpdatingBranch {
                        base_ref: observation.base_ref.clone(),
                        head_ref: observation.head_ref.clone(),
                    })
                    .await;

                    if cancel.is_cancelled() {
                        return self.cancelled(pr).await;
                    }
                    updated_from = Some(observation.head_sha.clone());
                    if let Err(e) = self
                        .source
                        .update_branch_from_base(pr, &observation.base_ref, &observation.head_ref)
                        .await
                    {
                        return self.write_failed(pr, e).await;
                    }

                    self.report(MergeEvent::BranchUpdated).await;
                }
                Decision::MergeNow(method) => {
                    self.report(MergeEvent::Merging {
                        method,
                        sha: observation.head_sha.clone(),
                    })
                    .await;

                    if cancel.is_cancelled() {
                        return self.cancelled(pr).await;
                    }
                    let message = merge_message(pr, &observation, method);
                    match self
                        .source
                        .merge_request(pr, method, &message, &observation.head_sha)
                        .await
                    {
                        Ok(result) => {
                            debug!(%pr, sha = ?result.sha, message = ?result.message, "merge accepted");
                            self.report(MergeEvent::MergeAccepted { sha: result.sha })
                                .await;
                        }
                        Err(e) => return self.write_failed(pr, e).await,
                    }
                }
            }
        }
    }

    fn decide(&self, observation: &Observation) -> Decision {
        decide(
            observation,
            self.options.method,
            self.options.retry_interval,
        )
    }

    /// Fetch the PR and then the build status of its head commit
    async fn observe(
        &self,
        pr: &PullRequestRef,
        cancel: &CancellationToken,
    ) -> std::result::Result<Observation, Interrupted> {
        let state = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Interrupted::Cancelled),
            result = self.source.fetch_request(pr) => result.map_err(Interrupted::Failed)?,
        };

        let build = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Interrupted::Cancelled),
            result = self.source.fetch_build_status(pr, &state.head_sha) => {
                result.map_err(Interrupted::Failed)?
            }
        };

        Ok(Observation::new(state, build))
    }

    fn budget_exceeded(&self, started: Instant, waits: u32, delay: Duration) -> Option<FailureReason> {
        if let Some(max) = self.options.max_retries
            && waits >= max
        {
            return Some(FailureReason::RetryBudgetExhausted { waits });
        }
        if let Some(timeout) = self.options.timeout
            && started.elapsed() + delay > timeout
        {
            return Some(FailureReason::DeadlineExceeded { timeout });
        }
        None
    }

    async fn write_failed(&self, pr: &PullRequestRef, e: Error) -> MergeOutcome {
        warn!(%pr, error = %e, "write rejected");
        let reason = if e.is_race() {
            FailureReason::Race(e.to_string())
        } else {
            FailureReason::Operational(e.to_string())
        };
        self.fail(reason).await
    }

    async fn fail(&self, reason: FailureReason) -> MergeOutcome {
        warn!(code = reason.code(), kind = ?reason.kind(), "merge run failed: {reason}");
        self.report(MergeEvent::Failed(reason.clone())).await;
        MergeOutcome::Fail(reason)
    }

    async fn cancelled(&self, pr: &PullRequestRef) -> MergeOutcome {
        info!(%pr, "merge run cancelled");
        self.report(MergeEvent::Cancelled).await;
        MergeOutcome::Fail(FailureReason::Cancelled)
    }

    async fn report(&self, event: MergeEvent) {
        debug!(%event, "merge event");
        self.progress.on_event(&event).await;
    }
}

fn wait_reason(observation: &Observation, update_pending: bool) -> WaitReason {
    match observation.mergeability {
        MergeabilityState::Unknown => WaitReason::MergeabilityUnknown,
        MergeabilityState::Behind if update_pending => WaitReason::BranchUpdatePending,
        _ => WaitReason::BuildPending,
    }
}

/// Build the merge commit message
///
/// Squash merges use the PR title (with its number) and body; other methods
/// keep the platform's default message.
fn merge_message(pr: &PullRequestRef, observation: &Observation, method: MergeMethod) -> MergeMessage {
    match method {
        MergeMethod::Squash if !observation.title.is_empty() => MergeMessage {
            title: Some(format!("{} (#{})", observation.title, pr.number)),
            body: observation.body.clone(),
        },
        _ => MergeMessage::default(),
    }
}
