//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::StatusSource;
use crate::types::{
    BuildStatus, MergeMessage, MergeMethod, MergeResult, MergeabilityState, Platform,
    PlatformConfig, PullRequestRef, PullRequestState,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::models::pulls::MergeableState;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GITHUB_API: &str = "https://api.github.com";

/// Default timeout for raw HTTP requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest page size the check runs API accepts
const CHECK_RUNS_PER_PAGE: u32 = 100;

/// Legacy combined commit status
#[derive(Debug, Deserialize)]
struct CombinedStatus {
    state: String,
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct CheckRunsResponse {
    total_count: u32,
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
}

#[derive(Serialize)]
struct MergeBranchPayload<'a> {
    base: &'a str,
    head: &'a str,
    commit_message: String,
}

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    /// Token for raw HTTP requests (status checks, branch merges)
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API base URL for raw requests
    api_base: String,
}

impl GitHubService {
    /// Create a new GitHub service
    pub fn new(token: &str, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let api_base = host
            .as_ref()
            .map_or_else(|| GITHUB_API.to_string(), |h| format!("https://{h}/api/v3"));
        let config = PlatformConfig {
            platform: Platform::GitHub,
            owner,
            repo,
            host,
        };
        Self::with_api_base(token, config, api_base)
    }

    /// Create a service talking to an explicit API base URL
    pub fn with_api_base(token: &str, config: PlatformConfig, api_base: String) -> Result<Self> {
        Self::with_timeout(
            token,
            config,
            api_base,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    fn with_timeout(
        token: &str,
        config: PlatformConfig,
        api_base: String,
        timeout: Duration,
    ) -> Result<Self> {
        let api_base = api_base.trim_end_matches('/').to_string();

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if api_base != GITHUB_API {
            builder = builder
                .base_uri(api_base.as_str())
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
        }
        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("mergeit")
            .timeout(timeout)
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    fn repo_url(&self, pr: &PullRequestRef, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_base, pr.owner, pr.repo)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Fetch legacy commit statuses via the combined status API
    async fn commit_statuses(&self, pr: &PullRequestRef, sha: &str) -> Result<Option<CombinedStatus>> {
        let url = self.repo_url(pr, &format!("/commits/{sha}/status"));

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to fetch commit status: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(sha, "combined status not found, assuming no statuses");
            return Ok(None);
        }

        let status: CombinedStatus = response
            .error_for_status()
            .map_err(|e| Error::GitHubApi(format!("Failed to fetch commit status: {e}")))?
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse commit status: {e}")))?;

        debug!(state = %status.state, count = status.total_count, "commit status result");
        Ok(Some(status))
    }

    /// Fetch GitHub Actions check runs, following pages until all are read
    async fn check_runs(&self, pr: &PullRequestRef, sha: &str) -> Result<Vec<CheckRun>> {
        let mut collected = Vec::new();
        let mut page = 1;

        loop {
            let url = self.repo_url(
                pr,
                &format!("/commits/{sha}/check-runs?per_page={CHECK_RUNS_PER_PAGE}&page={page}"),
            );

            let response = self
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::GitHubApi(format!("Failed to fetch check runs: {e}")))?;

            if response.status() == StatusCode::NOT_FOUND {
                debug!(sha, page, "check runs not found, assuming no more checks");
                return Ok(collected);
            }

            let runs: CheckRunsResponse = response
                .error_for_status()
                .map_err(|e| Error::GitHubApi(format!("Failed to fetch check runs: {e}")))?
                .json()
                .await
                .map_err(|e| Error::GitHubApi(format!("Failed to parse check runs: {e}")))?;

            let fetched = runs.check_runs.len();
            collected.extend(runs.check_runs);
            debug!(page, total = runs.total_count, collected = collected.len(), "check runs page");

            if fetched == 0 || collected.len() >= runs.total_count as usize {
                return Ok(collected);
            }
            page += 1;
        }
    }
}

/// Map GitHub's `mergeable_state` onto our state set
///
/// - `has_hooks` is clean with pre-receive hooks configured
/// - `unstable` is mergeable with non-passing checks; the build status decides
/// - `draft` cannot be merged until published
fn mergeability_from_github(state: Option<&MergeableState>) -> MergeabilityState {
    match state {
        None | Some(MergeableState::Unknown) => MergeabilityState::Unknown,
        Some(MergeableState::Clean | MergeableState::HasHooks) => MergeabilityState::Clean,
        Some(MergeableState::Behind) => MergeabilityState::Behind,
        Some(MergeableState::Dirty) => MergeabilityState::Dirty,
        Some(_) => MergeabilityState::Blocked,
    }
}

/// Aggregate commit statuses and check runs into one build status
///
/// Any failure wins, then anything still running; `NoStatus` only when
/// neither system reports anything for the commit.
fn combine_build_status(statuses: Option<&CombinedStatus>, runs: &[CheckRun]) -> BuildStatus {
    let mut any_pending = false;
    let mut any_success = false;

    if let Some(status) = statuses.filter(|s| s.total_count > 0) {
        match status.state.as_str() {
            "success" => any_success = true,
            "pending" => any_pending = true,
            _ => return BuildStatus::Failed,
        }
    }

    for run in runs {
        if run.status != "completed" {
            debug!(name = %run.name, status = %run.status, "check run still in progress");
            any_pending = true;
            continue;
        }
        match run.conclusion.as_deref() {
            Some("success" | "neutral" | "skipped") => any_success = true,
            conclusion => {
                debug!(name = %run.name, ?conclusion, "check run failed");
                return BuildStatus::Failed;
            }
        }
    }

    if any_pending {
        BuildStatus::Pending
    } else if any_success {
        BuildStatus::Success
    } else {
        BuildStatus::NoStatus
    }
}

/// Classify an octocrab merge error
///
/// 405 means GitHub refuses to merge; 409 means the head moved past the
/// SHA the merge was requested for. Both are races with our last observation.
fn classify_merge_error(e: octocrab::Error) -> Error {
    if let octocrab::Error::GitHub { source, .. } = &e {
        match source.status_code.as_u16() {
            405 | 409 => return Error::NotMergeable(source.message.clone()),
            _ => {}
        }
    }
    Error::GitHubApi(format!("Merge failed: {e}"))
}

#[async_trait]
impl StatusSource for GitHubService {
    async fn fetch_request(&self, pr: &PullRequestRef) -> Result<PullRequestState> {
        debug!(%pr, "fetching PR");

        let details = self.client.pulls(&pr.owner, &pr.repo).get(pr.number).await?;

        let merged = details.merged_at.is_some() || details.merged.unwrap_or(false);
        let mergeability = if merged {
            MergeabilityState::Merged
        } else {
            mergeability_from_github(details.mergeable_state.as_ref())
        };

        let state = PullRequestState {
            mergeability,
            head_sha: details.head.sha.clone(),
            merged,
            base_ref: details.base.ref_field.clone(),
            head_ref: details.head.ref_field.clone(),
            title: details.title.clone().unwrap_or_default(),
            body: details.body.clone(),
        };

        debug!(%pr, mergeability = %state.mergeability, sha = %state.head_sha, "fetched PR");
        Ok(state)
    }

    async fn fetch_build_status(&self, pr: &PullRequestRef, sha: &str) -> Result<BuildStatus> {
        debug!(%pr, sha, "fetching build status");

        let statuses = self.commit_statuses(pr, sha).await?;
        let runs = self.check_runs(pr, sha).await?;
        let build = combine_build_status(statuses.as_ref(), &runs);

        debug!(%pr, sha, %build, "fetched build status");
        Ok(build)
    }

    async fn update_branch_from_base(
        &self,
        pr: &PullRequestRef,
        base_ref: &str,
        head_ref: &str,
    ) -> Result<()> {
        debug!(%pr, base_ref, head_ref, "merging base into head");

        // The merges API merges `head` into `base`, so the PR's branches swap roles
        let payload = MergeBranchPayload {
            base: head_ref,
            head: base_ref,
            commit_message: format!("Merge branch '{base_ref}' into {head_ref}"),
        };

        let response = self
            .http_client
            .post(self.repo_url(pr, "/merges"))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to update branch: {e}")))?;

        match response.status() {
            StatusCode::CREATED => {
                debug!(%pr, "branch updated");
                Ok(())
            }
            StatusCode::NO_CONTENT => {
                debug!(%pr, "branch already up to date");
                Ok(())
            }
            StatusCode::CONFLICT => Err(Error::Conflict(format!(
                "merging {base_ref} into {head_ref} produced conflicts"
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::GitHubApi(format!(
                    "Failed to update branch ({status}): {body}"
                )))
            }
        }
    }

    async fn merge_request(
        &self,
        pr: &PullRequestRef,
        method: MergeMethod,
        message: &MergeMessage,
        expected_head_sha: &str,
    ) -> Result<MergeResult> {
        debug!(%pr, %method, sha = expected_head_sha, "merging PR");

        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let pulls = self.client.pulls(&pr.owner, &pr.repo);
        let mut builder = pulls
            .merge(pr.number)
            .method(octocrab_method)
            .sha(expected_head_sha);
        if let Some(ref title) = message.title {
            builder = builder.title(title);
        }
        if let Some(ref body) = message.body {
            builder = builder.message(body);
        }
        let result = builder.send().await.map_err(classify_merge_error)?;

        if !result.merged {
            return Err(Error::NotMergeable(
                result
                    .message
                    .unwrap_or_else(|| "GitHub declined the merge".to_string()),
            ));
        }

        let merge_result = MergeResult {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };

        debug!(
            %pr,
            merged = merge_result.merged,
            sha = ?merge_result.sha,
            "merge complete"
        );
        Ok(merge_result)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(status: &str, conclusion: Option<&str>) -> CheckRun {
        CheckRun {
            name: "ci".to_string(),
            status: status.to_string(),
            conclusion: conclusion.map(ToString::to_string),
        }
    }

    fn combined(state: &str, total_count: u32) -> CombinedStatus {
        CombinedStatus {
            state: state.to_string(),
            total_count,
        }
    }

    #[test]
    fn test_no_statuses_and_no_runs_is_no_status() {
        // GitHub reports "pending" for a commit with zero statuses
        let status = combined("pending", 0);
        assert_eq!(combine_build_status(Some(&status), &[]), BuildStatus::NoStatus);
        assert_eq!(combine_build_status(None, &[]), BuildStatus::NoStatus);
    }

    #[test]
    fn test_failure_wins_over_pending() {
        let status = combined("pending", 2);
        let runs = [run("completed", Some("failure"))];
        assert_eq!(combine_build_status(Some(&status), &runs), BuildStatus::Failed);
    }

    #[test]
    fn test_error_state_is_failure() {
        let status = combined("error", 1);
        assert_eq!(combine_build_status(Some(&status), &[]), BuildStatus::Failed);
    }

    #[test]
    fn test_running_check_is_pending() {
        let status = combined("success", 1);
        let runs = [run("completed", Some("success")), run("in_progress", None)];
        assert_eq!(combine_build_status(Some(&status), &runs), BuildStatus::Pending);
    }

    #[test]
    fn test_neutral_and_skipped_count_as_passing() {
        let runs = [
            run("completed", Some("neutral")),
            run("completed", Some("skipped")),
            run("completed", Some("success")),
        ];
        assert_eq!(combine_build_status(None, &runs), BuildStatus::Success);
    }

    #[test]
    fn test_completed_without_conclusion_is_failure() {
        let runs = [run("completed", None)];
        assert_eq!(combine_build_status(None, &runs), BuildStatus::Failed);
    }

    #[test]
    fn test_mergeable_state_mapping() {
        assert_eq!(mergeability_from_github(None), MergeabilityState::Unknown);
        assert_eq!(
            mergeability_from_github(Some(&MergeableState::HasHooks)),
            MergeabilityState::Clean
        );
        assert_eq!(
            mergeability_from_github(Some(&MergeableState::Unstable)),
            MergeabilityState::Blocked
        );
        assert_eq!(
            mergeability_from_github(Some(&MergeableState::Draft)),
            MergeabilityState::Blocked
        );
        assert_eq!(
            mergeability_from_github(Some(&MergeableState::Behind)),
            MergeabilityState::Behind
        );
    }

    #[tokio::test]
    async fn test_slow_status_endpoint_times_out() {
        let mut server = mockito::Server::new_async().await;
        let _status = server
            .mock("GET", "/repos/acme/widget/commits/abc123/status")
            .with_status(200)
            .with_body_from_request(|_| {
                std::thread::sleep(std::time::Duration::from_secs(2));
                br#"{"state": "success", "total_count": 1}"#.to_vec()
            })
            .create_async()
            .await;

        let config = PlatformConfig {
            platform: Platform::GitHub,
            owner: "acme".to_string(),
            repo: "widget".to_string(),
            host: None,
        };
        let service = GitHubService::with_timeout(
            "test-token",
            config,
            server.url(),
            Duration::from_millis(200),
        )
        .unwrap();

        let pr = PullRequestRef::new("acme", "widget", 42);
        let err = service.fetch_build_status(&pr, "abc123").await.unwrap_err();
        assert!(matches!(err, Error::GitHubApi(_)), "unexpected error: {err:?}");
    }
}
