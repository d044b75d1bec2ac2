//! Error types for mergeit

use thiserror::Error;

/// Errors produced by mergeit
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an invalid argument (bad URL, unknown merge method, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No token could be found for the platform
    #[error("authentication error: {0}")]
    Auth(String),

    /// Configuration file could not be read or parsed
    #[error("config error: {0}")]
    Config(String),

    /// GitHub API request failed
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// GitLab API request failed
    #[error("GitLab API error: {0}")]
    GitLabApi(String),

    /// Generic platform failure
    #[error("platform error: {0}")]
    Platform(String),

    /// Branch could not be updated from its base without manual resolution
    #[error("merge conflict: {0}")]
    Conflict(String),

    /// The platform rejected a merge it previously reported as possible
    #[error("not mergeable: {0}")]
    NotMergeable(String),

    /// Low-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<octocrab::Error> for Error {
    fn from(e: octocrab::Error) -> Self {
        Self::GitHubApi(e.to_string())
    }
}

impl Error {
    /// Whether the error means platform state changed between observation and action
    pub const fn is_race(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::NotMergeable(_))
    }
}

/// Result alias using mergeit's `Error`
pub type Result<T> = std::result::Result<T, Error>;
