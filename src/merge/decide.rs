//! Merge decision policy - pure functions
//!
//! This module contains the pure, testable logic that maps one observation
//! to one action. No I/O happens here - all data is passed in.

use crate::merge::outcome::FailureReason;
use crate::types::{BuildStatus, MergeMethod, MergeabilityState, Observation};
use std::time::Duration;

/// The single action to take for an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Merge the PR now with this method
    MergeNow(MergeMethod),
    /// Merge the base branch into the head branch
    UpdateBranch,
    /// Nothing actionable yet; observe again after the delay
    RetryAfter(Duration),
    /// Stop without merging
    Fail(FailureReason),
    /// PR is already merged
    Success,
}

impl Decision {
    /// Whether this decision ends the run
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Fail(_) | Self::Success)
    }

    /// Whether this decision issues a write to the platform
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::MergeNow(_) | Self::UpdateBranch)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MergeNow(method) => write!(f, "merge now ({method})"),
            Self::UpdateBranch => write!(f, "update branch from base"),
            Self::RetryAfter(delay) => write!(f, "retry in {}s", delay.as_secs()),
            Self::Fail(reason) => write!(f, "fail: {reason}"),
            Self::Success => write!(f, "already merged"),
        }
    }
}

/// Decide what to do for an observation (PURE - no I/O, easily testable)
///
/// Rules are evaluated top to bottom, first match wins:
///
/// | observation                  | decision                       |
/// |------------------------------|--------------------------------|
/// | already merged               | `Success`                      |
/// | `Unknown`                    | `RetryAfter(retry_interval)`   |
/// | `Dirty`                      | `Fail(Conflicts)`              |
/// | `Behind`                     | `UpdateBranch`                 |
/// | `Blocked` + `Failed`         | `Fail(BuildFailed)`            |
/// | `Blocked` + `Pending`        | `RetryAfter(retry_interval)`   |
/// | `Blocked` + `Success`        | `Fail(BlockedDespiteGreenBuild)` |
/// | `Clean`                      | `MergeNow(method)`             |
/// | anything else                | `Fail(InconsistentState)`      |
#[must_use]
pub fn decide(observation: &Observation, method: MergeMethod, retry_interval: Duration) -> Decision {
    if observation.merged {
        return Decision::Success;
    }

    match (observation.mergeability, observation.build) {
        (MergeabilityState::Merged, _) => Decision::Success,
        (MergeabilityState::Unknown, _)
        | (MergeabilityState::Blocked, BuildStatus::Pending) => {
            Decision::RetryAfter(retry_interval)
        }
        (MergeabilityState::Dirty, _) => Decision::Fail(FailureReason::Conflicts),
        (MergeabilityState::Behind, _) => Decision::UpdateBranch,
        (MergeabilityState::Blocked, BuildStatus::Failed) => {
            Decision::Fail(FailureReason::BuildFailed)
        }
        (MergeabilityState::Blocked, BuildStatus::Success) => {
            Decision::Fail(FailureReason::BlockedDespiteGreenBuild)
        }
        (MergeabilityState::Clean, _) => Decision::MergeNow(method),
        (mergeability @ MergeabilityState::Blocked, build @ BuildStatus::NoStatus) => {
            Decision::Fail(FailureReason::InconsistentState {
                mergeability,
                build,
            })
        }
    }
}
