//! Platform services for GitHub and GitLab
//!
//! Provides a unified interface for reading merge readiness and performing
//! the two writes the merge loop needs.

mod detection;
mod factory;
mod github;
mod gitlab;

pub use detection::{detect_platform, parse_pr_url};
pub use factory::create_status_source;
pub use github::GitHubService;
pub use gitlab::GitLabService;

use crate::error::Result;
use crate::types::{
    BuildStatus, MergeMessage, MergeMethod, MergeResult, PlatformConfig, PullRequestRef,
    PullRequestState,
};
use async_trait::async_trait;

/// Source of PR state and target of merge writes
///
/// This trait abstracts GitHub and GitLab, allowing the merge loop to run
/// unchanged against either platform (or a scripted mock in tests).
///
/// Error contract:
/// - transport/API failures surface as `GitHubApi`, `GitLabApi`, `Http`, or `Platform`
/// - `update_branch_from_base` reports unresolvable updates as `Error::Conflict`
/// - `merge_request` reports a platform-side refusal as `Error::NotMergeable`
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the PR's mergeability, head SHA, and branch names
    async fn fetch_request(&self, pr: &PullRequestRef) -> Result<PullRequestState>;

    /// Fetch the combined build status for a commit
    async fn fetch_build_status(&self, pr: &PullRequestRef, sha: &str) -> Result<BuildStatus>;

    /// Bring the head branch up to date with its base branch
    async fn update_branch_from_base(
        &self,
        pr: &PullRequestRef,
        base_ref: &str,
        head_ref: &str,
    ) -> Result<()>;

    /// Merge the PR with the given method
    ///
    /// `expected_head_sha` is the head SHA the merge decision was made
    /// against; the platform refuses the merge if the head has moved since.
    async fn merge_request(
        &self,
        pr: &PullRequestRef,
        method: MergeMethod,
        message: &MergeMessage,
        expected_head_sha: &str,
    ) -> Result<MergeResult>;

    /// Get the platform configuration
    fn config(&self) -> &PlatformConfig;
}
