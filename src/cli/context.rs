//! Shared command context for CLI commands
//!
//! Turns the raw command-line input into everything a merge run needs.

use mergeit::config::{MergeitConfig, default_config_path, load_config};
use mergeit::error::Result;
use mergeit::platform::{StatusSource, create_status_source, parse_pr_url};
use mergeit::types::{PlatformConfig, PullRequestRef};
use std::path::Path;

/// Shared context for commands that talk to the platform
///
/// This performs the common setup:
/// - Parse the PR URL and detect the platform
/// - Load the config file
/// - Resolve the API token and create the platform service
pub struct CommandContext {
    /// Platform hosting the PR
    pub platform_config: PlatformConfig,
    /// The PR being merged
    pub pr: PullRequestRef,
    /// Loaded configuration
    pub config: MergeitConfig,
    /// Platform service (GitHub/GitLab)
    pub source: Box<dyn StatusSource>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(pr_url: &str, config_path: Option<&Path>) -> Result<Self> {
        let (platform_config, pr) = parse_pr_url(pr_url)?;

        let config = match config_path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => load_config(&path)?,
            None => MergeitConfig::default(),
        };

        let source = create_status_source(&platform_config)?;

        Ok(Self {
            platform_config,
            pr,
            config,
            source,
        })
    }
}
