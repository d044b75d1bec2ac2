//! Construct the status source matching a platform config

use crate::auth::get_auth;
use crate::error::Result;
use crate::platform::{GitHubService, GitLabService, StatusSource};
use crate::types::{Platform, PlatformConfig};

/// Create a status source for the given platform, authenticating from the environment
pub fn create_status_source(config: &PlatformConfig) -> Result<Box<dyn StatusSource>> {
    let auth = get_auth(config.platform)?;
    tracing::debug!(platform = %config.platform, source = auth.source, "resolved API token");

    match config.platform {
        Platform::GitHub => Ok(Box::new(GitHubService::new(
            &auth.token,
            config.owner.clone(),
            config.repo.clone(),
            config.host.clone(),
        )?)),
        Platform::GitLab => Ok(Box::new(GitLabService::new(
            auth.token,
            config.owner.clone(),
            config.repo.clone(),
            config.host.clone(),
        )?)),
    }
}
