//! Securing models.

mod local;
mod remote;

pub use self::local::{DateSource, LocalFile};
pub use self::remote::{RemoteDailyFolder, RemoteFolderName};
use time::OffsetDateTime;

/// Record of one successfully secured file, created immediately after its
/// upload completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredFileSummary {
    pub upload_start: OffsetDateTime,
    pub upload_end: OffsetDateTime,
    pub secured_file: LocalFile,
}
impl SecuredFileSummary {
    pub fn new(upload_start: OffsetDateTime, upload_end: OffsetDateTime, secured_file: LocalFile) -> Self {
        Self { upload_start, upload_end, secured_file }
    }
}
