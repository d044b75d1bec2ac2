//! Progress reporting for merge runs
//!
//! Every state transition of the merge loop is delivered to a
//! [`ProgressCallback`] as a [`MergeEvent`], so callers can render them
//! (CLI, chat) or record them (tests).

use crate::merge::decide::Decision;
use crate::merge::outcome::FailureReason;
use crate::types::{MergeMethod, Observation, PullRequestRef};
use async_trait::async_trait;
use std::time::Duration;

/// Why the loop is waiting before the next observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Platform is still computing mergeability
    MergeabilityUnknown,
    /// Build is still running
    BuildPending,
    /// Branch was updated but the platform has not caught up yet
    BranchUpdatePending,
}

/// A reportable state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEvent {
    /// Fetching PR state
    FetchStarted {
        /// PR being fetched
        pr: PullRequestRef,
        /// 1-based observation count for this run
        attempt: u32,
    },
    /// PR state observed and a decision made
    Observed {
        /// The observation
        observation: Box<Observation>,
        /// Decision taken for it
        decision: Decision,
    },
    /// Waiting before observing again
    RetryScheduled {
        /// How long the run will wait
        delay: Duration,
        /// Why it is waiting
        reason: WaitReason,
    },
    /// Merging base into head
    UpdatingBranch {
        /// Base branch
        base_ref: String,
        /// Head branch
        head_ref: String,
    },
    /// Branch update accepted by the platform
    BranchUpdated,
    /// Merge requested
    Merging {
        /// Merge method
        method: MergeMethod,
        /// Head SHA the merge was requested for
        sha: String,
    },
    /// Merge accepted by the platform
    MergeAccepted {
        /// Merge commit SHA, if reported
        sha: Option<String>,
    },
    /// PR is merged; the run ends successfully
    Succeeded,
    /// Run ended without merging
    Failed(FailureReason),
    /// Run was cancelled
    Cancelled,
}

impl std::fmt::Display for MergeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchStarted { pr, attempt } => {
                write!(f, "Fetching PR #{} from {}/{}", pr.number, pr.owner, pr.repo)?;
                if *attempt > 1 {
                    write!(f, " (attempt {attempt})")?;
                }
                write!(f, "...")
            }
            Self::Observed {
                observation,
                decision,
            } => write!(
                f,
                "[{}] State {} / build {} at {}: {decision}",
                observation.observed_at.format("%H:%M:%S"),
                observation.mergeability,
                observation.build,
                observation.short_sha()
            ),
            Self::RetryScheduled { delay, reason } => {
                let secs = delay.as_secs();
                match reason {
                    WaitReason::MergeabilityUnknown => {
                        write!(f, "Merge state unknown, retrying in {secs}s.")
                    }
                    WaitReason::BuildPending => {
                        write!(f, "Build in progress. Retrying in {secs}s.")
                    }
                    WaitReason::BranchUpdatePending => {
                        write!(f, "Waiting for the branch update to register, retrying in {secs}s.")
                    }
                }
            }
            Self::UpdatingBranch { base_ref, head_ref } => write!(
                f,
                "PR is out-of-date; merging the latest changes from {base_ref} into {head_ref}."
            ),
            Self::BranchUpdated => write!(f, "PR up-to-date, checking again."),
            Self::Merging { method, .. } => {
                write!(f, "Ready to be merged! Merging with the \"{method}\" method.")
            }
            Self::MergeAccepted { sha } => match sha {
                Some(sha) => write!(f, "Merge accepted: {sha}"),
                None => write!(f, "Merge accepted."),
            },
            Self::Succeeded => write!(f, "PR successfully merged."),
            Self::Failed(reason) => write!(f, "Giving up: {reason}."),
            Self::Cancelled => write!(f, "Cancelled."),
        }
    }
}

/// Receives merge loop events
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called once per state transition, in order
    async fn on_event(&self, event: &MergeEvent);
}

/// Progress callback that ignores every event
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_event(&self, _event: &MergeEvent) {}
}
