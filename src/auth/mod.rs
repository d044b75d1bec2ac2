//! Authentication for GitHub and GitLab
//!
//! Tokens are read from environment variables; mergeit does not manage them.

use crate::error::{Error, Result};
use crate::types::Platform;
use std::env;

/// Environment variables consulted for a GitHub token, in order
pub const GITHUB_TOKEN_VARS: &[&str] = &["GH_ACCESS_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"];

/// Environment variables consulted for a GitLab token, in order
pub const GITLAB_TOKEN_VARS: &[&str] = &["GITLAB_TOKEN", "GL_TOKEN"];

/// A resolved API token
#[derive(Clone)]
pub struct AuthConfig {
    /// The token value
    pub token: String,
    /// Environment variable the token came from
    pub source: &'static str,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve the API token for a platform from the environment
pub fn get_auth(platform: Platform) -> Result<AuthConfig> {
    let vars = token_vars(platform);
    resolve_token(vars, |name| env::var(name).ok()).ok_or_else(|| {
        Error::Auth(format!(
            "no {platform} token found; set one of {}",
            vars.join(", ")
        ))
    })
}

const fn token_vars(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::GitHub => GITHUB_TOKEN_VARS,
        Platform::GitLab => GITLAB_TOKEN_VARS,
    }
}

fn resolve_token(
    vars: &'static [&'static str],
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<AuthConfig> {
    vars.iter().find_map(|&name| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|token| AuthConfig {
                token,
                source: name,
            })
    })
}
