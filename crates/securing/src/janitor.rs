//! Housekeeping: rotating old daily folders out of the remote store and
//! removing secured files from the monitored directory.

use crate::error::Result;
use crate::models::LocalFile;
use crate::storage::StorageServiceHandle;
use std::io::ErrorKind as IoErrorKind;
use tracing::instrument;

pub struct Janitor {
    storage: StorageServiceHandle,
    max_daily_folders: usize,
}

impl Janitor {
    pub fn new(storage: StorageServiceHandle, max_daily_folders: usize) -> Self {
        Self { storage, max_daily_folders }
    }

    /// Delete the oldest daily folders until no more than
    /// `max_daily_folders` remain.
    ///
    /// Stops early if there is no oldest folder to delete, or if a deletion
    /// did not bring the count down.
    #[instrument(skip(self), fields(max = self.max_daily_folders))]
    pub fn rotate_remote_daily_folders(&self) -> Result<()> {
        loop {
            let count = self.storage.daily_folder_count();
            if count <= self.max_daily_folders {
                return Ok(());
            }
            let Some(oldest) = self.storage.find_oldest_daily_folder() else {
                return Ok(());
            };
            tracing::info!(folder = %oldest, count, "Rotating out oldest daily folder");
            self.storage.delete_daily_folder(&oldest)?;
            if self.storage.daily_folder_count() >= count {
                tracing::warn!(folder = %oldest, count, "Daily folder count did not shrink; giving up on rotation");
                return Ok(());
            }
        }
    }

    /// Delete a secured file from the local disk.
    ///
    /// Failures are logged, not escalated. Returns whether the file is gone,
    /// which includes it having been removed by someone else already.
    pub fn cleanup_secured_file(&self, file: &LocalFile) -> bool {
        tracing::info!(%file, "Deleting");
        match std::fs::remove_file(file.path()) {
            Ok(()) => true,
            Err(error) if error.kind() == IoErrorKind::NotFound => {
                tracing::debug!(%file, "Secured file was already gone");
                true
            },
            Err(error) => {
                tracing::warn!(%file, %error, "Failed to delete secured file");
                false
            },
        }
    }
}
