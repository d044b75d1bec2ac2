//! Core types for mergeit

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Detected platform type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// GitHub or GitHub Enterprise
    GitHub,
    /// GitLab or self-hosted GitLab
    GitLab,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitHub => write!(f, "GitHub"),
            Self::GitLab => write!(f, "GitLab"),
        }
    }
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Platform type
    pub platform: Platform,
    /// Repository owner (user, organization, or GitLab group path)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com/gitlab.com)
    pub host: Option<String>,
}

/// Identifies a single pull request (or GitLab merge request)
///
/// Supplied by the caller and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// Repository owner (user, organization, or GitLab group path)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// PR/MR number
    pub number: u64,
}

impl PullRequestRef {
    /// Create a new reference
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Platform-computed readiness of a PR to be merged
///
/// The platform recomputes this asynchronously after any push to the PR
/// or its base branch, so `Unknown` is an expected transient value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeabilityState {
    /// Still being computed
    Unknown,
    /// Ready to merge
    Clean,
    /// Head branch lacks commits present on the base branch
    Behind,
    /// Merge forbidden for a reason other than conflicts (reviews, checks, ...)
    Blocked,
    /// Head branch conflicts with the base branch
    Dirty,
    /// Already merged
    Merged,
}

impl std::fmt::Display for MergeabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Clean => write!(f, "clean"),
            Self::Behind => write!(f, "behind"),
            Self::Blocked => write!(f, "blocked"),
            Self::Dirty => write!(f, "dirty"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Aggregated result of every status check attached to a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildStatus {
    /// At least one check is still running
    Pending,
    /// All checks passed
    Success,
    /// At least one check failed
    Failed,
    /// No checks are configured for the commit
    NoStatus,
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::NoStatus => write!(f, "no status"),
        }
    }
}

/// PR state as returned by `StatusSource::fetch_request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestState {
    /// Current mergeability
    pub mergeability: MergeabilityState,
    /// SHA of the head commit
    pub head_sha: String,
    /// Whether the PR has already been merged
    pub merged: bool,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// PR title (used for squash commit titles)
    pub title: String,
    /// PR body (used for squash commit messages)
    pub body: Option<String>,
}

/// A point-in-time snapshot of a PR's merge readiness
///
/// Produced once per loop iteration and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Mergeability at observation time
    pub mergeability: MergeabilityState,
    /// Combined build status of `head_sha`
    pub build: BuildStatus,
    /// SHA of the head commit
    pub head_sha: String,
    /// Whether the PR has already been merged
    pub merged: bool,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// PR title
    pub title: String,
    /// PR body
    pub body: Option<String>,
    /// When the observation was taken
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Combine a fetched PR state with the build status of its head commit
    pub fn new(state: PullRequestState, build: BuildStatus) -> Self {
        Self {
            mergeability: state.mergeability,
            build,
            head_sha: state.head_sha,
            merged: state.merged,
            base_ref: state.base_ref,
            head_ref: state.head_ref,
            title: state.title,
            body: state.body,
            observed_at: Utc::now(),
        }
    }

    /// Abbreviated head SHA for display
    pub fn short_sha(&self) -> &str {
        self.head_sha.get(..7).unwrap_or(&self.head_sha)
    }
}

/// Result of a merge operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Whether the merge was successful
    pub merged: bool,
    /// The SHA of the merge commit (if successful)
    pub sha: Option<String>,
    /// Message from the merge operation (especially on failure)
    pub message: Option<String>,
}

/// Commit message for a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeMessage {
    /// Commit title (None = platform default)
    pub title: Option<String>,
    /// Commit body (None = platform default)
    pub body: Option<String>,
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Squash all commits into one
    #[default]
    Squash,
    /// Create a merge commit
    Merge,
    /// Rebase commits onto base branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

impl FromStr for MergeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squash" => Ok(Self::Squash),
            "merge" => Ok(Self::Merge),
            "rebase" => Ok(Self::Rebase),
            other => Err(Error::InvalidArgument(format!(
                "unknown merge method '{other}' (expected merge, squash, or rebase)"
            ))),
        }
    }
}
