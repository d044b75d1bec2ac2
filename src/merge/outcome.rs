//! Terminal results of a merge run

use crate::types::{BuildStatus, MergeabilityState};
use std::time::Duration;

/// Category of a failure, so callers can decide whether re-running makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected condition that needs a human (conflicts, red build, review block)
    Policy,
    /// A write was rejected because the PR changed after it was observed
    Race,
    /// Network or API failure
    Operational,
    /// Observation not covered by the decision table
    Defensive,
    /// Configured retry limit or deadline was reached
    Budget,
    /// Caller cancelled the run
    Cancelled,
}

/// Why a merge run stopped without merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Head branch conflicts with base
    Conflicts,
    /// Build failed on the head commit
    BuildFailed,
    /// Platform blocks the merge although the build is green
    BlockedDespiteGreenBuild,
    /// Mergeability/build combination the policy does not handle
    InconsistentState {
        /// Observed mergeability
        mergeability: MergeabilityState,
        /// Observed build status
        build: BuildStatus,
    },
    /// Platform state changed between observation and action
    Race(String),
    /// Transport or API failure
    Operational(String),
    /// `max_retries` waits were used up
    RetryBudgetExhausted {
        /// Number of waits performed
        waits: u32,
    },
    /// The run's overall timeout would be exceeded by another wait
    DeadlineExceeded {
        /// Configured timeout
        timeout: Duration,
    },
    /// Run was cancelled by the caller
    Cancelled,
}

impl FailureReason {
    /// Failure category
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Conflicts | Self::BuildFailed | Self::BlockedDespiteGreenBuild => {
                FailureKind::Policy
            }
            Self::InconsistentState { .. } => FailureKind::Defensive,
            Self::Race(_) => FailureKind::Race,
            Self::Operational(_) => FailureKind::Operational,
            Self::RetryBudgetExhausted { .. } | Self::DeadlineExceeded { .. } => {
                FailureKind::Budget
            }
            Self::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Short stable identifier
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Conflicts => "conflicts",
            Self::BuildFailed => "build failed",
            Self::BlockedDespiteGreenBuild => "blocked despite green build",
            Self::InconsistentState { .. } => "inconsistent state",
            Self::Race(_) => "race",
            Self::Operational(_) => "operational",
            Self::RetryBudgetExhausted { .. } => "retry budget exhausted",
            Self::DeadlineExceeded { .. } => "deadline exceeded",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflicts => write!(f, "PR has conflicts that must be manually resolved"),
            Self::BuildFailed => write!(f, "build failed and must be manually fixed"),
            Self::BlockedDespiteGreenBuild => write!(
                f,
                "PR is blocked despite a green build (required review or other platform rule)"
            ),
            Self::InconsistentState {
                mergeability,
                build,
            } => write!(
                f,
                "inconsistent state: mergeability '{mergeability}' with build '{build}'"
            ),
            Self::Race(detail) => {
                write!(f, "PR changed before the action completed: {detail}")
            }
            Self::Operational(detail) => write!(f, "operational failure: {detail}"),
            Self::RetryBudgetExhausted { waits } => write!(f, "gave up after {waits} retries"),
            Self::DeadlineExceeded { timeout } => {
                write!(f, "gave up after {}s timeout", timeout.as_secs())
            }
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal result of a merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The PR is merged
    Success,
    /// The run stopped without merging
    Fail(FailureReason),
}

impl MergeOutcome {
    /// Whether the PR ended up merged
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Failure reason, if the run failed
    pub const fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Success => None,
            Self::Fail(reason) => Some(reason),
        }
    }
}
