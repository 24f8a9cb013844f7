//! Securing of individual local files.

use crate::clock::ClockHandle;
use crate::error::Result;
use crate::events::NotifierHandle;
use crate::models::{LocalFile, RemoteDailyFolder, RemoteFolderName, SecuredFileSummary};
use crate::storage::StorageServiceHandle;
use tracing::instrument;

/// Uploads local files into the daily folder matching their date.
pub struct Securer {
    storage: StorageServiceHandle,
    notifier: NotifierHandle,
    clock: ClockHandle,
}

impl Securer {
    pub fn new(storage: StorageServiceHandle, notifier: NotifierHandle, clock: ClockHandle) -> Self {
        Self { storage, notifier, clock }
    }

    /// Make sure the daily folder for `file` exists, creating it (and
    /// announcing the creation) if it does not. Returns `true` if the folder
    /// was created by this call.
    ///
    /// Must be called from a single sequential path: the absence check and
    /// the creation are two separate steps.
    #[instrument(skip(self), fields(file = %file))]
    pub fn ensure_remote_daily_folder(&self, file: &LocalFile) -> Result<bool> {
        let name = RemoteFolderName::from_date(file.date());
        if !self.storage.is_top_level_folder_with_name_absent(&name) {
            return Ok(false);
        }
        tracing::info!(folder = %name, "Creating folder");
        self.storage.create_top_level_folder(&name)?;
        tracing::info!(folder = %name, "Created folder");
        self.notifier.notify_new_remote_daily_folder_created(&name);
        Ok(true)
    }

    /// Whether the daily folder `file` would be uploaded into is known to
    /// exist.
    pub fn has_remote_daily_folder(&self, file: &LocalFile) -> bool {
        !self.storage.is_top_level_folder_with_name_absent(&RemoteFolderName::from_date(file.date()))
    }

    /// Upload `file` into its daily folder and announce it as secured.
    ///
    /// On failure nothing is announced, and the local file is left alone.
    #[instrument(skip(self), fields(file = %file))]
    pub fn secure(&self, file: &LocalFile) -> Result<()> {
        tracing::info!("Securing");
        let target = RemoteDailyFolder::from_date(file.date());
        let upload_start = self.clock.now();
        self.storage.upload(&target, file)?;
        let upload_end = self.clock.now();
        tracing::info!(folder = %target, "Secured");
        self.notifier.notify_file_secured(SecuredFileSummary::new(upload_start, upload_end, file.clone()));
        Ok(())
    }
}
