//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::time::Duration;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Folder (or its parent) does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Folder or file already exists (for operations that require new entries)
    #[display("already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Folder or file name is blank, contains separators, or escapes its parent
    #[display("invalid name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The remote end is throttling us; back off and try again.
    #[display("rate limit exceeded: {_0}")]
    RateLimited(#[error(not(source))] String),
    /// Network-related error (timeouts, dropped connections, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// A retried operation failed with an error that will not go away.
    #[display("non-retryable failure")]
    NonRetryable,
    /// A retried operation kept failing transiently until its budget ran out.
    #[display("giving up on retrying; timeout expired: {_0:?}")]
    Timeout(#[error(not(source))] Duration),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Network(_))
    }
}
