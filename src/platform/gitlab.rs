//! GitLab platform service implementation

use crate::error::{Error, Result};
use crate::platform::StatusSource;
use crate::types::{
    BuildStatus, MergeMessage, MergeMethod, MergeResult, MergeabilityState, Platform,
    PlatformConfig, PullRequestRef, PullRequestState,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// MR details needed for merge decisions
#[derive(Deserialize)]
struct MergeRequestDetails {
    title: String,
    description: Option<String>,
    state: String, // "opened", "closed", "merged", "locked"
    #[serde(default)]
    detailed_merge_status: Option<String>,
    #[serde(default)]
    has_conflicts: bool,
    sha: Option<String>,
    source_branch: String,
    target_branch: String,
}

/// Pipeline status
#[derive(Deserialize)]
struct Pipeline {
    status: String,
}

/// Merge response
#[derive(Deserialize)]
struct MergeResponse {
    state: String,
    merge_commit_sha: Option<String>,
    squash_commit_sha: Option<String>,
}

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// GitLab service using reqwest
pub struct GitLabService {
    client: Client,
    token: String,
    api_base: String,
    config: PlatformConfig,
}

impl GitLabService {
    /// Create a new GitLab service
    pub fn new(token: String, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let api_base = format!("https://{}/api/v4", host.as_deref().unwrap_or("gitlab.com"));
        let config = PlatformConfig {
            platform: Platform::GitLab,
            owner,
            repo,
            host,
        };
        Self::with_api_base(token, config, api_base)
    }

    /// Create a service talking to an explicit API base URL
    pub fn with_api_base(token: String, config: PlatformConfig, api_base: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::GitLabApi(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn mr_url(&self, pr: &PullRequestRef, suffix: &str) -> String {
        let project = urlencoding::encode(&format!("{}/{}", pr.owner, pr.repo)).into_owned();
        format!(
            "{}/projects/{project}/merge_requests/{}{suffix}",
            self.api_base, pr.number
        )
    }

    fn project_url(&self, pr: &PullRequestRef, suffix: &str) -> String {
        let project = urlencoding::encode(&format!("{}/{}", pr.owner, pr.repo)).into_owned();
        format!("{}/projects/{project}{suffix}", self.api_base)
    }
}

/// Map GitLab's `detailed_merge_status` onto our state set
///
/// CI-related statuses map to `Blocked` so the build status decides between
/// waiting and failing.
fn mergeability_from_gitlab(detailed: Option<&str>, has_conflicts: bool) -> MergeabilityState {
    if has_conflicts {
        return MergeabilityState::Dirty;
    }
    match detailed {
        None | Some("checking" | "unchecked" | "preparing" | "approvals_syncing") => {
            MergeabilityState::Unknown
        }
        Some("mergeable") => MergeabilityState::Clean,
        Some("need_rebase") => MergeabilityState::Behind,
        Some("conflict") => MergeabilityState::Dirty,
        Some(_) => MergeabilityState::Blocked,
    }
}

fn build_status_from_pipeline(pipeline: Option<&Pipeline>) -> BuildStatus {
    match pipeline.map(|p| p.status.as_str()) {
        None | Some("skipped") => BuildStatus::NoStatus,
        Some("success") => BuildStatus::Success,
        Some("failed" | "canceled") => BuildStatus::Failed,
        // created, waiting_for_resource, preparing, pending, running, scheduled, manual
        Some(_) => BuildStatus::Pending,
    }
}

#[async_trait]
impl StatusSource for GitLabService {
    async fn fetch_request(&self, pr: &PullRequestRef) -> Result<PullRequestState> {
        debug!(%pr, "fetching MR");

        let mr: MergeRequestDetails = self
            .client
            .get(self.mr_url(pr, ""))
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::GitLabApi(e.to_string()))?
            .json()
            .await?;

        let merged = mr.state == "merged";
        let mergeability = if merged {
            MergeabilityState::Merged
        } else {
            mergeability_from_gitlab(mr.detailed_merge_status.as_deref(), mr.has_conflicts)
        };

        let state = PullRequestState {
            mergeability,
            head_sha: mr.sha.unwrap_or_default(),
            merged,
            base_ref: mr.target_branch,
            head_ref: mr.source_branch,
            title: mr.title,
            body: mr.description,
        };

        debug!(%pr, mergeability = %state.mergeability, sha = %state.head_sha, "fetched MR");
        Ok(state)
    }

    async fn fetch_build_status(&self, pr: &PullRequestRef, sha: &str) -> Result<BuildStatus> {
        debug!(%pr, sha, "fetching pipeline status");

        let pipelines: Vec<Pipeline> = self
            .client
            .get(self.project_url(pr, "/pipelines"))
            .header("PRIVATE-TOKEN", &self.token)
            .query(&[
                ("sha", sha),
                ("order_by", "id"),
                ("sort", "desc"),
                ("per_page", "1"),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::GitLabApi(e.to_string()))?
            .json()
            .await?;

        let build = build_status_from_pipeline(pipelines.first());
        debug!(%pr, sha, %build, "fetched pipeline status");
        Ok(build)
    }

    async fn update_branch_from_base(
        &self,
        pr: &PullRequestRef,
        base_ref: &str,
        head_ref: &str,
    ) -> Result<()> {
        debug!(%pr, base_ref, head_ref, "rebasing MR onto target");

        let response = self
            .client
            .put(self.mr_url(pr, "/rebase"))
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(%pr, "rebase accepted");
                Ok(())
            }
            StatusCode::CONFLICT => Err(Error::Conflict(format!(
                "GitLab could not rebase {head_ref} onto {base_ref}"
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::GitLabApi(format!("Rebase failed ({status}): {body}")))
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
        debug!(%pr, %method, sha = expected_head_sha, "merging MR");

        let commit_message = match (&message.title, &message.body) {
            (Some(title), Some(body)) if !body.is_empty() => Some(format!("{title}\n\n{body}")),
            (Some(title), _) => Some(title.clone()),
            (None, body) => body.clone(),
        };

        // Merge commit vs. fast-forward is a project setting on GitLab;
        // only squashing can be chosen per request.
        let mut body = serde_json::json!({
            "sha": expected_head_sha,
            "squash": method == MergeMethod::Squash,
        });
        if let Some(msg) = commit_message {
            let key = if method == MergeMethod::Squash {
                "squash_commit_message"
            } else {
                "merge_commit_message"
            };
            body[key] = serde_json::Value::String(msg);
        }

        let response = self
            .client
            .put(self.mr_url(pr, "/merge"))
            .header("PRIVATE-TOKEN", &self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 405 | 406 | 409 | 422) {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::NotMergeable(format!("GitLab refused merge ({status}): {text}")));
        }

        let merged: MergeResponse = response
            .error_for_status()
            .map_err(|e| Error::GitLabApi(format!("Merge failed: {e}")))?
            .json()
            .await?;

        let merge_result = MergeResult {
            merged: merged.state == "merged",
            sha: merged.squash_commit_sha.or(merged.merge_commit_sha),
            message: None,
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
