//! Scripted status source for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use mergeit::error::{Error, Result};
use mergeit::merge::{MergeEvent, ProgressCallback};
use mergeit::platform::StatusSource;
use mergeit::types::{
    BuildStatus, MergeMessage, MergeMethod, MergeResult, MergeabilityState, PlatformConfig,
    PullRequestRef, PullRequestState,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::github_config;

/// One recorded call against the mock, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `fetch_request`
    FetchRequest(PullRequestRef),
    /// `fetch_build_status` for a SHA
    FetchBuildStatus(String),
    /// `update_branch_from_base`
    UpdateBranch {
        base_ref: String,
        head_ref: String,
    },
    /// `merge_request`
    Merge {
        pr: PullRequestRef,
        method: MergeMethod,
        message: MergeMessage,
        sha: String,
    },
}

impl Call {
    /// Whether this call is a write
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::UpdateBranch { .. } | Self::Merge { .. })
    }
}

/// Error to inject, rebuilt on every call since `Error` is not `Clone`
#[derive(Debug, Clone)]
enum Injected {
    Transport(String),
    Conflict(String),
    NotMergeable(String),
}

impl Injected {
    fn to_error(&self) -> Error {
        match self {
            Self::Transport(msg) => Error::Platform(msg.clone()),
            Self::Conflict(msg) => Error::Conflict(msg.clone()),
            Self::NotMergeable(msg) => Error::NotMergeable(msg.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Step {
    mergeability: MergeabilityState,
    build: BuildStatus,
    sha: String,
}

/// Scripted mock status source
///
/// This manually implements `StatusSource` rather than using a mocking
/// crate so the script and call log stay easy to read in assertions.
///
/// Features:
/// - Scripted sequence of observations; the last one repeats forever
/// - A successful merge flips every later observation to merged
/// - Ordered call log for verification
/// - Error injection for failure path testing
/// - A slow `fetch_request` and a token cancelled from inside writes, for
///   cancellation timing
pub struct MockStatusSource {
    config: PlatformConfig,
    script: Mutex<VecDeque<Step>>,
    current: Mutex<Option<Step>>,
    merged: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
    // Error injection
    error_on_fetch_request: Mutex<Option<Injected>>,
    error_on_build_status: Mutex<Option<Injected>>,
    error_on_update: Mutex<Option<Injected>>,
    error_on_merge: Mutex<Option<Injected>>,
    fetch_delay: Mutex<Option<Duration>>,
    cancel_during_writes: Mutex<Option<CancellationToken>>,
}

impl MockStatusSource {
    /// Create a new mock with the given config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            script: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            merged: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
            error_on_fetch_request: Mutex::new(None),
            error_on_build_status: Mutex::new(None),
            error_on_update: Mutex::new(None),
            error_on_merge: Mutex::new(None),
            fetch_delay: Mutex::new(None),
            cancel_during_writes: Mutex::new(None),
        }
    }

    /// Create a mock for `acme/widget`
    pub fn new() -> Self {
        Self::with_config(github_config())
    }

    /// Append an observation to the script
    pub fn push_state(&self, mergeability: MergeabilityState, build: BuildStatus, sha: &str) {
        self.script.lock().unwrap().push_back(Step {
            mergeability,
            build,
            sha: sha.to_string(),
        });
    }

    /// Builder-style variant of `push_state`
    #[must_use]
    pub fn then(self, mergeability: MergeabilityState, build: BuildStatus, sha: &str) -> Self {
        self.push_state(mergeability, build, sha);
        self
    }

    // === Error injection methods ===

    /// Make `fetch_request` return a transport error
    pub fn fail_fetch_request(&self, msg: &str) {
        *self.error_on_fetch_request.lock().unwrap() = Some(Injected::Transport(msg.to_string()));
    }

    /// Make `fetch_build_status` return a transport error
    pub fn fail_build_status(&self, msg: &str) {
        *self.error_on_build_status.lock().unwrap() = Some(Injected::Transport(msg.to_string()));
    }

    /// Make `update_branch_from_base` return a transport error
    pub fn fail_update(&self, msg: &str) {
        *self.error_on_update.lock().unwrap() = Some(Injected::Transport(msg.to_string()));
    }

    /// Make `update_branch_from_base` report a conflict
    pub fn conflict_on_update(&self, msg: &str) {
        *self.error_on_update.lock().unwrap() = Some(Injected::Conflict(msg.to_string()));
    }

    /// Make `merge_request` return a transport error
    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(Injected::Transport(msg.to_string()));
    }

    /// Make `merge_request` report the PR as not mergeable
    pub fn reject_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(Injected::NotMergeable(msg.to_string()));
    }

    // === Timing hooks ===

    /// Make `fetch_request` take `delay` before answering
    pub fn delay_fetch_request(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    /// Cancel `token` while a write is in flight, before the write returns
    pub fn cancel_during_writes(&self, token: CancellationToken) {
        *self.cancel_during_writes.lock().unwrap() = Some(token);
    }

    // === Call verification methods ===

    /// All calls, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the write calls, in order
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Number of `fetch_request` calls
    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::FetchRequest(_)))
            .count()
    }

    /// Number of `update_branch_from_base` calls
    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::UpdateBranch { .. }))
            .count()
    }

    /// Number of `merge_request` calls
    pub fn merge_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Merge { .. }))
            .count()
    }

    /// Assert that no write was ever issued
    pub fn assert_no_writes(&self) {
        let writes = self.writes();
        assert!(writes.is_empty(), "Expected no writes but got: {writes:?}");
    }

    /// Assert that `merge_request` was called with a specific method
    pub fn assert_merge_called_with_method(&self, method: MergeMethod) {
        let calls = self.calls();
        assert!(
            calls
                .iter()
                .any(|c| matches!(c, Call::Merge { method: m, .. } if *m == method)),
            "Expected merge_request(.., {method:?}) but got: {calls:?}"
        );
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Simulate a write that is cancelled mid-flight but still completes
    async fn write_in_flight(&self) {
        let token = self.cancel_during_writes.lock().unwrap().clone();
        if let Some(token) = token {
            token.cancel();
            tokio::task::yield_now().await;
        }
    }

    /// Advance the script: pop the next step, or keep repeating the last one
    fn next_step(&self) -> Step {
        let mut current = self.current.lock().unwrap();
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            *current = Some(step);
        }
        current
            .clone()
            .expect("MockStatusSource: no state scripted; call push_state first")
    }
}

impl Default for MockStatusSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSource for MockStatusSource {
    async fn fetch_request(&self, pr: &PullRequestRef) -> Result<PullRequestState> {
        self.record(Call::FetchRequest(pr.clone()));

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(injected) = self.error_on_fetch_request.lock().unwrap().as_ref() {
            return Err(injected.to_error());
        }

        let step = self.next_step();
        let merged = *self.merged.lock().unwrap() || step.mergeability == MergeabilityState::Merged;
        Ok(PullRequestState {
            mergeability: if merged {
                MergeabilityState::Merged
            } else {
                step.mergeability
            },
            head_sha: step.sha,
            merged,
            base_ref: "main".to_string(),
            head_ref: "feature".to_string(),
            title: "Add widget".to_string(),
            body: Some("Adds the widget.".to_string()),
        })
    }

    async fn fetch_build_status(&self, _pr: &PullRequestRef, sha: &str) -> Result<BuildStatus> {
        self.record(Call::FetchBuildStatus(sha.to_string()));

        if let Some(injected) = self.error_on_build_status.lock().unwrap().as_ref() {
            return Err(injected.to_error());
        }

        let current = self.current.lock().unwrap();
        Ok(current.as_ref().map_or(BuildStatus::NoStatus, |s| s.build))
    }

    async fn update_branch_from_base(
        &self,
        _pr: &PullRequestRef,
        base_ref: &str,
        head_ref: &str,
    ) -> Result<()> {
        self.record(Call::UpdateBranch {
            base_ref: base_ref.to_string(),
            head_ref: head_ref.to_string(),
        });
        self.write_in_flight().await;

        if let Some(injected) = self.error_on_update.lock().unwrap().as_ref() {
            return Err(injected.to_error());
        }
        Ok(())
    }

    async fn merge_request(
        &self,
        pr: &PullRequestRef,
        method: MergeMethod,
        message: &MergeMessage,
        expected_head_sha: &str,
    ) -> Result<MergeResult> {
        self.record(Call::Merge {
            pr: pr.clone(),
            method,
            message: message.clone(),
            sha: expected_head_sha.to_string(),
        });
        self.write_in_flight().await;

        if let Some(injected) = self.error_on_merge.lock().unwrap().as_ref() {
            return Err(injected.to_error());
        }

        *self.merged.lock().unwrap() = true;
        Ok(MergeResult {
            merged: true,
            sha: Some(format!("merged_{expected_head_sha}")),
            message: None,
        })
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}

/// Progress callback that records every event
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<MergeEvent>>,
}

impl RecordingProgress {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received, in order
    pub fn events(&self) -> Vec<MergeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events reduced to their variant names, for order assertions
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|e| match e {
                MergeEvent::FetchStarted { .. } => "fetch",
                MergeEvent::Observed { .. } => "observed",
                MergeEvent::RetryScheduled { .. } => "retry",
                MergeEvent::UpdatingBranch { .. } => "updating",
                MergeEvent::BranchUpdated => "updated",
                MergeEvent::Merging { .. } => "merging",
                MergeEvent::MergeAccepted { .. } => "merge_accepted",
                MergeEvent::Succeeded => "succeeded",
                MergeEvent::Failed(_) => "failed",
                MergeEvent::Cancelled => "cancelled",
            })
            .collect()
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_event(&self, event: &MergeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
