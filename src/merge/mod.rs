//! Merge engine for a single PR
//!
//! Split the way the rest of the crate is:
//! 1. Observe - fetch PR state and build status (effectful)
//! 2. Decide - map the observation to one `Decision` (pure, testable)
//! 3. Act - update the branch, merge, wait, or stop (effectful)

mod decide;
mod execute;
mod outcome;
mod progress;

pub use decide::{Decision, decide};
pub use execute::{DEFAULT_RETRY_INTERVAL, MergeOptions, MergeOrchestrator};
pub use outcome::{FailureKind, FailureReason, MergeOutcome};
pub use progress::{MergeEvent, NoopProgress, ProgressCallback, WaitReason};
