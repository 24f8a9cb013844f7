//! Stats Error Types

use derive_more::{Display, Error};

/// A stats error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for stats operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Statistics need at least one secured file to describe.
    #[display("secured files summaries are required but none were provided")]
    EmptyBatch,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
