use crate::blocker::{Blocker, ThreadBlocker};
use crate::error::{ErrorKind, Result};
use std::error::Error as StdError;
use std::time::Duration;

/// Wait before the second attempt; later waits grow from this.
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_millis(200);

/// Outcome of a single attempt, as classified by the caller.
pub enum Attempt<T, E> {
    /// The action succeeded; stop and return the value.
    Success(T),
    /// The action failed, but trying again later might help.
    Retryable(E),
    /// The action failed and will keep failing; stop immediately.
    Fatal(E),
}

/// Executes an action on the caller's thread, retrying transient failures
/// with exponential back-off until it succeeds, fails permanently, or runs
/// out of time.
///
/// The delay before attempt `n + 1` is `initial_wait * (2^n - 1)`, so with
/// the default 200ms the first attempt happens immediately, followed by
/// waits of 200ms, 600ms, 1.4s, 3s, 6.2s and so on.
///
/// # Examples
///
/// ```
/// use hoard_retry::{Attempt, RetryingExecutor};
/// use std::time::Duration;
///
/// #[derive(Debug, derive_more::Display, derive_more::Error)]
/// struct Busy;
///
/// let executor = RetryingExecutor::new().with_initial_wait(Duration::from_millis(1));
/// let mut calls = 0;
/// let value = executor.run(Duration::from_secs(5), || {}, || {
///     calls += 1;
///     match calls {
///         1 => Attempt::Retryable(exn::Exn::from(Busy)),
///         _ => Attempt::Success(calls),
///     }
/// });
/// assert_eq!(value.unwrap(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RetryingExecutor<B = ThreadBlocker> {
    blocker: B,
    initial_wait: Duration,
}

impl RetryingExecutor {
    pub fn new() -> Self {
        Self::with_blocker(ThreadBlocker)
    }
}

impl Default for RetryingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Blocker> RetryingExecutor<B> {
    pub fn with_blocker(blocker: B) -> Self {
        Self { blocker, initial_wait: DEFAULT_INITIAL_WAIT }
    }

    pub fn with_initial_wait(mut self, initial_wait: Duration) -> Self {
        self.initial_wait = initial_wait;
        self
    }

    /// Delay to wait before the attempt following attempt number `attempt`.
    ///
    /// Saturates rather than overflowing for absurd attempt counts.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).map_or(u64::MAX, |power| power - 1);
        let nanos = u64::try_from(self.initial_wait.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(nanos.saturating_mul(factor))
    }

    /// Retry `action` for as long as it fails with an error that satisfies
    /// `is_retryable`, or until `timeout` is reached.
    ///
    /// Convenience wrapper around [`run`](Self::run) for actions that report
    /// failure through a plain [`Result`].
    ///
    /// # Errors
    /// - [`ErrorKind::NonRetryable`] wrapping the action's error when it
    ///   fails with an error rejected by `is_retryable`.
    /// - [`ErrorKind::Expired`] when the time budget runs out; `on_expire`
    ///   has been invoked by then.
    pub fn retry<T, E, F, P>(&self, timeout: Duration, is_retryable: P, on_expire: impl FnOnce(), mut action: F) -> Result<T>
    where
        E: StdError + Send + Sync + 'static,
        F: FnMut() -> std::result::Result<T, exn::Exn<E>>,
        P: Fn(&E) -> bool,
    {
        self.run(timeout, on_expire, || match action() {
            Ok(value) => Attempt::Success(value),
            Err(err) if is_retryable(&*err) => Attempt::Retryable(err),
            Err(err) => Attempt::Fatal(err),
        })
    }

    /// Run `action` until it returns [`Attempt::Success`] or
    /// [`Attempt::Fatal`], or until `timeout` is reached.
    ///
    /// Blocking happens synchronously on the calling thread. The elapsed time
    /// of every iteration (delay plus action) is charged against `timeout`,
    /// and another attempt is made for as long as any budget is left.
    ///
    /// `on_expire` is invoked exactly once when the loop ends with the budget
    /// used up, including when the attempt that used it up failed fatally; the
    /// fatal error is still what gets returned. An attempt that succeeds never
    /// triggers it, even if it used up the last of the budget.
    pub fn run<T, E, F>(&self, timeout: Duration, on_expire: impl FnOnce(), mut action: F) -> Result<T>
    where
        E: StdError + Send + Sync + 'static,
        F: FnMut() -> Attempt<T, exn::Exn<E>>,
    {
        let mut next_delay = Duration::ZERO;
        let mut remaining = timeout;
        let mut attempt: u32 = 0;
        let mut fatal = None;

        while !remaining.is_zero() {
            let started = self.blocker.now();
            tracing::debug!(attempt = attempt + 1, delay = ?next_delay, "Delaying attempt");
            self.blocker.block_for(next_delay);

            attempt += 1;
            let outcome = action();
            next_delay = self.backoff(attempt);
            remaining = remaining.saturating_sub(self.blocker.now().saturating_duration_since(started));

            match outcome {
                Attempt::Success(value) => {
                    if attempt > 1 {
                        tracing::warn!(attempt, "There were failed attempts before this one; succeeded on attempt");
                    }
                    return Ok(value);
                },
                Attempt::Retryable(err) => {
                    tracing::warn!(attempt, error = ?err, "Retryable failure");
                },
                Attempt::Fatal(err) => {
                    fatal = Some(err);
                    break;
                },
            }
        }

        if remaining.is_zero() {
            tracing::debug!(?timeout, attempts = attempt, "Timeout reached; invoking expiration action");
            on_expire();
        }
        match fatal {
            Some(err) => Err(err.raise(ErrorKind::NonRetryable { attempts: attempt })),
            None => exn::bail!(ErrorKind::Expired { timeout, attempts: attempt }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocker::ManualBlocker;
    use derive_more::{Display, Error};
    use rstest::rstest;
    use std::cell::Cell;

    #[derive(Debug, Display, Error, PartialEq, Eq)]
    enum Failure {
        Busy,
        Broken,
    }

    const A_YEAR: Duration = Duration::from_secs(60 * 60 * 24 * 365);

    fn executor() -> (RetryingExecutor<ManualBlocker>, ManualBlocker) {
        let blocker = ManualBlocker::default();
        (RetryingExecutor::with_blocker(blocker.clone()), blocker)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 200)]
    #[case(2, 600)]
    #[case(3, 1_400)]
    #[case(4, 3_000)]
    #[case(5, 6_200)]
    #[case(6, 12_600)]
    #[case(7, 25_400)]
    #[case(8, 51_000)]
    #[case(9, 102_200)]
    fn test_backoff(#[case] attempt: u32, #[case] expected_millis: u64) {
        let executor = RetryingExecutor::new();
        assert_eq!(executor.backoff(attempt), Duration::from_millis(expected_millis));
    }

    #[test]
    fn test_backoff_saturates() {
        let executor = RetryingExecutor::new();
        assert_eq!(executor.backoff(200), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_success_on_first_attempt_without_delay() {
        let (executor, blocker) = executor();
        let expired = Cell::new(false);
        let calls = Cell::new(0);

        let result = executor.retry(A_YEAR, |_: &Failure| true, || expired.set(true), || {
            calls.set(calls.get() + 1);
            Ok::<_, exn::Exn<Failure>>("done")
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 1);
        assert!(!expired.get());
        assert_eq!(blocker.blocked(), vec![Duration::ZERO]);
    }

    #[test]
    fn test_retryable_twice_then_success() {
        let (executor, _) = executor();
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result = executor.retry(
            A_YEAR,
            |err: &Failure| *err == Failure::Busy,
            || expired.set(expired.get() + 1),
            || {
                calls.set(calls.get() + 1);
                match calls.get() {
                    1 | 2 => Err(exn::Exn::from(Failure::Busy)),
                    _ => Ok(()),
                }
            },
        );

        assert!(result.is_ok());
        assert_eq!(calls.get(), 3);
        assert_eq!(expired.get(), 0);
    }

    #[test]
    fn test_non_retryable_stops_immediately() {
        let (executor, _) = executor();
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.retry(
            A_YEAR,
            |err: &Failure| *err == Failure::Busy,
            || expired.set(expired.get() + 1),
            || {
                calls.set(calls.get() + 1);
                Err(exn::Exn::from(Failure::Broken))
            },
        );

        let err = result.unwrap_err();
        assert_eq!(*err, ErrorKind::NonRetryable { attempts: 1 });
        assert_eq!(calls.get(), 1);
        assert_eq!(expired.get(), 0);
    }

    /// Takes a fixed 200ms per block whatever it is asked for, like a
    /// sleep that always overshoots to the scheduler's granularity.
    struct FixedStepBlocker(ManualBlocker);
    impl Blocker for FixedStepBlocker {
        fn now(&self) -> std::time::Instant {
            self.0.now()
        }

        fn block_for(&self, _duration: Duration) {
            self.0.advance(Duration::from_millis(200));
        }
    }

    #[test]
    fn test_expires_while_failing_retryably() {
        let blocker = ManualBlocker::default();
        let executor = RetryingExecutor::with_blocker(FixedStepBlocker(blocker.clone()));
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.run(Duration::from_millis(300), || expired.set(expired.get() + 1), || {
            calls.set(calls.get() + 1);
            Attempt::Retryable(exn::Exn::from(Failure::Busy))
        });

        let err = result.unwrap_err();
        assert!(matches!(*err, ErrorKind::Expired { attempts: 2, .. }));
        assert_eq!(expired.get(), 1);
        assert!(calls.get() <= 2);
    }

    #[test]
    fn test_attempts_while_any_budget_is_left() {
        let (executor, blocker) = executor();
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.run(Duration::from_millis(1_000), || expired.set(expired.get() + 1), || {
            calls.set(calls.get() + 1);
            Attempt::Retryable(exn::Exn::from(Failure::Busy))
        });

        assert!(matches!(*result.unwrap_err(), ErrorKind::Expired { attempts: 4, .. }));
        assert_eq!(calls.get(), 4);
        assert_eq!(expired.get(), 1);
        // 200ms were still left after the third attempt.
        let expected: Vec<_> = [0, 200, 600, 1_400].into_iter().map(Duration::from_millis).collect();
        assert_eq!(blocker.blocked(), expected);
    }

    #[test]
    fn test_expires_when_each_attempt_is_slow() {
        let (executor, blocker) = executor();
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.run(Duration::from_millis(300), || expired.set(expired.get() + 1), || {
            calls.set(calls.get() + 1);
            blocker.advance(Duration::from_millis(200));
            Attempt::Retryable(exn::Exn::from(Failure::Busy))
        });

        assert!(result.is_err());
        assert_eq!(expired.get(), 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_success_using_whole_budget_does_not_expire() {
        let (executor, blocker) = executor();
        let expired = Cell::new(false);

        let result = executor.run(Duration::from_millis(300), || expired.set(true), || {
            blocker.advance(Duration::from_secs(1));
            Attempt::<_, exn::Exn<Failure>>::Success(42)
        });

        assert_eq!(result.unwrap(), 42);
        assert!(!expired.get());
    }

    #[test]
    fn test_fatal_using_whole_budget_expires_and_stays_fatal() {
        let (executor, blocker) = executor();
        let expired = Cell::new(0);

        let result: Result<()> = executor.run(Duration::from_millis(300), || expired.set(expired.get() + 1), || {
            blocker.advance(Duration::from_secs(1));
            Attempt::Fatal(exn::Exn::from(Failure::Broken))
        });

        assert_eq!(*result.unwrap_err(), ErrorKind::NonRetryable { attempts: 1 });
        assert_eq!(expired.get(), 1);
    }

    #[test]
    fn test_fatal_after_retries_within_budget_does_not_expire() {
        let (executor, _) = executor();
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.run(A_YEAR, || expired.set(expired.get() + 1), || {
            calls.set(calls.get() + 1);
            match calls.get() {
                1 => Attempt::Retryable(exn::Exn::from(Failure::Busy)),
                _ => Attempt::Fatal(exn::Exn::from(Failure::Broken)),
            }
        });

        assert_eq!(*result.unwrap_err(), ErrorKind::NonRetryable { attempts: 2 });
        assert_eq!(expired.get(), 0);
    }

    #[test]
    fn test_zero_timeout_expires_without_attempting() {
        let (executor, _) = executor();
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.run(Duration::ZERO, || expired.set(expired.get() + 1), || {
            calls.set(calls.get() + 1);
            Attempt::<_, exn::Exn<Failure>>::Success(())
        });

        assert!(matches!(*result.unwrap_err(), ErrorKind::Expired { attempts: 0, .. }));
        assert_eq!(calls.get(), 0);
        assert_eq!(expired.get(), 1);
    }

    #[test]
    fn test_delays_follow_exponential_backoff() {
        let (executor, blocker) = executor();
        let calls = Cell::new(0);

        let result = executor.run(A_YEAR, || {}, || {
            calls.set(calls.get() + 1);
            match calls.get() {
                1..=9 => Attempt::Retryable(exn::Exn::from(Failure::Busy)),
                _ => Attempt::Success(()),
            }
        });

        assert!(result.is_ok());
        let expected: Vec<_> = [0, 200, 600, 1_400, 3_000, 6_200, 12_600, 25_400, 51_000, 102_200]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(blocker.blocked(), expected);
    }

    #[test]
    fn test_real_blocker_expires() {
        let executor = RetryingExecutor::new().with_initial_wait(Duration::from_millis(5));
        let expired = Cell::new(0);
        let calls = Cell::new(0);

        let result: Result<()> = executor.run(Duration::from_millis(50), || expired.set(expired.get() + 1), || {
            calls.set(calls.get() + 1);
            Attempt::Retryable(exn::Exn::from(Failure::Busy))
        });

        assert!(result.is_err());
        assert_eq!(expired.get(), 1);
        assert!(calls.get() >= 1);
    }
}
