//! Blocking retry executor.
//!
//! Runs an action on the calling thread and keeps retrying it with
//! exponential back-off while it fails with errors the caller deems
//! transient, until it succeeds, fails permanently, or a time budget runs
//! out. See [`RetryingExecutor`] for the exact schedule.

mod blocker;
pub mod error;
mod executor;

#[cfg(any(test, feature = "mock"))]
pub use crate::blocker::ManualBlocker;
pub use crate::blocker::{Blocker, ThreadBlocker};
pub use crate::executor::{Attempt, DEFAULT_INITIAL_WAIT, RetryingExecutor};
