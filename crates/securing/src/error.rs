//! Securing Error Types

use crate::models::RemoteFolderName;
use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A securing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for securing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Upload target is not a cached daily folder; ensure it exists first.
    #[display("failed to upload; target folder {_0} does not exist")]
    FolderAbsent(#[error(not(source))] RemoteFolderName),
    /// The folder cache has not been populated yet.
    #[display("remote storage has not been initialised")]
    NotInitialised,
    /// The remote store rejected or failed the request.
    #[display("remote storage operation failed")]
    Storage,
    /// No calendar date can be derived from the file.
    #[display("cannot derive a date for {_0:?}")]
    InvalidFileName(#[error(not(source))] String),
    /// Not a `yyyy-MM-dd` date.
    #[display("invalid daily folder name {_0:?}")]
    InvalidFolderName(#[error(not(source))] String),
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if securing the same file again later might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FolderAbsent(_) | Self::Storage | Self::Io(_))
    }
}
