//! Retry Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The failure that stopped the retry
//! loop (if any) is kept as a child frame of the returned error.

use derive_more::{Display, Error};
use std::time::Duration;

/// A retry error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for retried operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why the executor stopped without a successful attempt.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The action failed with an error the caller classified as permanent.
    /// No further attempts were made.
    #[display("non-retryable failure on attempt {attempts}")]
    NonRetryable { attempts: u32 },
    /// The time budget ran out while the action kept failing with retryable
    /// errors.
    #[display("giving up on retrying; timeout expired after {timeout:?} ({attempts} attempts)")]
    Expired { timeout: Duration, attempts: u32 },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// An expired budget may well succeed later (the remote end was merely
    /// busy), a non-retryable failure will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::NonRetryable { attempts: 1 }.to_string(),
            "non-retryable failure on attempt 1"
        );
        assert_eq!(
            ErrorKind::Expired { timeout: Duration::from_millis(300), attempts: 2 }.to_string(),
            "giving up on retrying; timeout expired after 300ms (2 attempts)"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::NonRetryable { attempts: 3 }.is_retryable());
        assert!(ErrorKind::Expired { timeout: Duration::ZERO, attempts: 0 }.is_retryable());
    }
}
