//! Shared test helpers

#![allow(dead_code)]

mod mock_platform;

pub use mock_platform::{Call, MockStatusSource, RecordingProgress};

use mergeit::merge::MergeOptions;
use mergeit::types::{
    BuildStatus, MergeMethod, MergeabilityState, Observation, Platform, PlatformConfig,
    PullRequestRef, PullRequestState,
};
use std::time::Duration;

/// Config for the `acme/widget` GitHub repository used across tests
pub fn github_config() -> PlatformConfig {
    PlatformConfig {
        platform: Platform::GitHub,
        owner: "acme".to_string(),
        repo: "widget".to_string(),
        host: None,
    }
}

/// `acme/widget#42`
pub fn widget_pr() -> PullRequestRef {
    PullRequestRef::new("acme", "widget", 42)
}

/// Options with a tiny retry interval so loops finish quickly
pub fn fast_options(method: MergeMethod) -> MergeOptions {
    MergeOptions {
        method,
        retry_interval: Duration::from_millis(1),
        max_retries: None,
        timeout: None,
    }
}

/// Build an observation directly, for pure decision tests
pub fn make_observation(mergeability: MergeabilityState, build: BuildStatus) -> Observation {
    Observation::new(
        PullRequestState {
            mergeability,
            head_sha: "abc123".to_string(),
            merged: mergeability == MergeabilityState::Merged,
            base_ref: "main".to_string(),
            head_ref: "feature".to_string(),
            title: "Add widget".to_string(),
            body: Some("Adds the widget.".to_string()),
        },
        build,
    )
}

/// Every mergeability state
pub const ALL_MERGEABILITY: [MergeabilityState; 6] = [
    MergeabilityState::Unknown,
    MergeabilityState::Clean,
    MergeabilityState::Behind,
    MergeabilityState::Blocked,
    MergeabilityState::Dirty,
    MergeabilityState::Merged,
];

/// Every build status
pub const ALL_BUILD: [BuildStatus; 4] = [
    BuildStatus::Pending,
    BuildStatus::Success,
    BuildStatus::Failed,
    BuildStatus::NoStatus,
];
