//! Time source and blocking used by the executor.
//!
//! The executor never touches the system clock directly, which keeps the
//! back-off schedule testable without actually sleeping for minutes.

use std::time::{Duration, Instant};

/// Blocks the calling thread and tells the time.
pub trait Blocker: Send + Sync {
    /// The current instant, as seen by this blocker.
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`. There is no cooperative
    /// yielding: whatever thread calls this is occupied for the whole delay.
    fn block_for(&self, duration: Duration);
}

/// Real blocker backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadBlocker;

impl Blocker for ThreadBlocker {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn block_for(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tracing::trace!(?duration, "Blocking before next attempt");
        std::thread::sleep(duration);
    }
}

impl<B: Blocker + ?Sized> Blocker for std::sync::Arc<B> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn block_for(&self, duration: Duration) {
        (**self).block_for(duration)
    }
}

#[cfg(any(test, feature = "mock"))]
pub use self::manual::ManualBlocker;

#[cfg(any(test, feature = "mock"))]
mod manual {
    use super::Blocker;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::{Duration, Instant};

    #[derive(Debug)]
    struct State {
        now: Instant,
        blocked: Vec<Duration>,
    }

    /// Virtual-time blocker for tests.
    ///
    /// Blocking returns immediately but advances the virtual clock by the
    /// requested duration and records it. Clones share the same clock, so an
    /// action under test can call [`advance`](Self::advance) to pretend it
    /// took a while.
    #[derive(Debug, Clone)]
    pub struct ManualBlocker {
        state: Arc<Mutex<State>>,
    }

    impl Default for ManualBlocker {
        fn default() -> Self {
            Self {
                state: Arc::new(Mutex::new(State { now: Instant::now(), blocked: Vec::new() })),
            }
        }
    }

    impl ManualBlocker {
        /// Move the virtual clock forward without recording a block.
        pub fn advance(&self, duration: Duration) {
            self.state.lock().unwrap_or_else(PoisonError::into_inner).now += duration;
        }

        /// Every duration passed to [`block_for`](Blocker::block_for), in order.
        pub fn blocked(&self) -> Vec<Duration> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner).blocked.clone()
        }
    }

    impl Blocker for ManualBlocker {
        fn now(&self) -> Instant {
            self.state.lock().unwrap_or_else(PoisonError::into_inner).now
        }

        fn block_for(&self, duration: Duration) {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.now += duration;
            state.blocked.push(duration);
        }
    }
}
