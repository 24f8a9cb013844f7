//! Application Error Types

use derive_more::{Display, Error};

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("failed to set up logging")]
    Logging,
    #[display("failed to open remote store")]
    Storage,
    #[display("failed to prepare remote daily folders")]
    Startup,
    #[display("background task failed: {_0}")]
    Task(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
