//! Daily folder cache over a remote store.
//!
//! [`DailyFolderStorage`] keeps an in-memory view of the daily folders under
//! the configured root folder, so that checking whether a folder exists
//! never costs a remote round trip. The view is populated once by
//! [`init`](RemoteStorageService::init) and from then on kept in step with
//! every creation and deletion made through it.

use crate::error::{ErrorKind, Result};
use crate::models::{LocalFile, RemoteDailyFolder, RemoteFolderName};
use exn::ResultExt;
use hoard_storage::{RemoteFolder, StoreHandle};
use regex::Regex;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::instrument;

/// Daily folder operations the securing process relies on.
pub trait RemoteStorageService: Send + Sync {
    /// Resolve the root folder and (re)populate the daily folder cache.
    fn init(&self) -> Result<()>;

    fn daily_folder_count(&self) -> usize;

    /// The daily folder with the smallest name, if there are any.
    fn find_oldest_daily_folder(&self) -> Option<RemoteDailyFolder>;

    fn is_top_level_folder_with_name_absent(&self, name: &RemoteFolderName) -> bool;

    /// Create a daily folder under the root folder.
    ///
    /// Callers are expected to have checked the folder is absent first; a
    /// request for a folder that is already cached does nothing.
    fn create_top_level_folder(&self, name: &RemoteFolderName) -> Result<()>;

    /// Delete a daily folder. Deleting a folder that is not cached does
    /// nothing.
    fn delete_daily_folder(&self, folder: &RemoteDailyFolder) -> Result<()>;

    /// Upload a local file into an existing daily folder.
    ///
    /// Never creates the folder: uploads run in parallel, and creating
    /// folders here could produce duplicates.
    fn upload(&self, target: &RemoteDailyFolder, file: &LocalFile) -> Result<()>;
}

pub type StorageServiceHandle = Arc<dyn RemoteStorageService>;

#[derive(Default)]
struct Cache {
    root: Option<RemoteFolder>,
    daily_folders: Vec<RemoteFolder>,
}
impl Cache {
    fn position(&self, name: &RemoteFolderName) -> Option<usize> {
        self.daily_folders.iter().position(|folder| folder.name == name.as_str())
    }
}

/// [`RemoteStorageService`] backed by a [`RemoteStore`](hoard_storage::RemoteStore).
///
/// The cache sits behind a single [`RwLock`]. Folder creation and deletion
/// hold the write lock for the duration of the remote call, so the cache
/// never disagrees with the remote store about a folder it has touched.
/// Uploads only hold the read lock long enough to look up the folder.
///
/// Over a [`RetryingBackend`](hoard_storage::backend::RetryingBackend) the
/// remote call includes every retry, so the write lock can be held for up to
/// the retry timeout. Lookups and uploads starting in that window wait for
/// it; an absence check never answers from a cache that is about to change.
pub struct DailyFolderStorage {
    store: StoreHandle,
    root_folder_name: String,
    daily_folder_pattern: Regex,
    cache: RwLock<Cache>,
}

impl DailyFolderStorage {
    pub fn new(store: StoreHandle, root_folder_name: impl Into<String>, daily_folder_pattern: Regex) -> Self {
        Self {
            store,
            root_folder_name: root_folder_name.into(),
            daily_folder_pattern,
            cache: RwLock::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Cache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Cache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_cache(cache: &Cache) {
        tracing::debug!(count = cache.daily_folders.len(), folders = ?cache.daily_folders, "Daily folders cached");
    }
}

impl RemoteStorageService for DailyFolderStorage {
    #[instrument(skip(self), fields(backend = self.store.name(), root = %self.root_folder_name))]
    fn init(&self) -> Result<()> {
        let root = self.store.get_root_folder(&self.root_folder_name).or_raise(|| ErrorKind::Storage)?;
        let daily_folders: Vec<_> = self
            .store
            .child_folders_of(&root)
            .or_raise(|| ErrorKind::Storage)?
            .into_iter()
            .filter(|folder| self.daily_folder_pattern.is_match(&folder.name))
            .collect();

        let mut cache = self.write();
        *cache = Cache { root: Some(root), daily_folders };
        Self::log_cache(&cache);
        tracing::debug!("Initialised");
        Ok(())
    }

    fn daily_folder_count(&self) -> usize {
        self.read().daily_folders.len()
    }

    fn find_oldest_daily_folder(&self) -> Option<RemoteDailyFolder> {
        self.read()
            .daily_folders
            .iter()
            .min_by(|a, b| a.name.cmp(&b.name))
            .map(|folder| RemoteDailyFolder::new(RemoteFolderName::from_listed(&folder.name)))
    }

    fn is_top_level_folder_with_name_absent(&self, name: &RemoteFolderName) -> bool {
        self.read().position(name).is_none()
    }

    #[instrument(skip(self), fields(folder = %name))]
    fn create_top_level_folder(&self, name: &RemoteFolderName) -> Result<()> {
        let mut cache = self.write();
        let Some(root) = cache.root.as_ref() else {
            exn::bail!(ErrorKind::NotInitialised);
        };
        if cache.position(name).is_some() {
            tracing::debug!("Daily folder already cached; not creating it again");
            return Ok(());
        }
        tracing::debug!("Creating top level folder");
        let created = self.store.create_child_folder(&root.id, name.as_str()).or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(?created, "Created top level folder");
        cache.daily_folders.push(created);
        Self::log_cache(&cache);
        Ok(())
    }

    #[instrument(skip(self), fields(folder = %folder))]
    fn delete_daily_folder(&self, folder: &RemoteDailyFolder) -> Result<()> {
        let mut cache = self.write();
        let Some(position) = cache.position(folder.name()) else {
            tracing::debug!("Daily folder not cached; nothing to delete");
            return Ok(());
        };
        tracing::debug!("Deleting daily folder");
        self.store.delete_folder(&cache.daily_folders[position]).or_raise(|| ErrorKind::Storage)?;
        cache.daily_folders.remove(position);
        Self::log_cache(&cache);
        Ok(())
    }

    #[instrument(skip(self, file), fields(folder = %target, file = %file))]
    fn upload(&self, target: &RemoteDailyFolder, file: &LocalFile) -> Result<()> {
        let folder_id = {
            let cache = self.read();
            match cache.position(target.name()) {
                Some(position) => cache.daily_folders[position].id.clone(),
                None => exn::bail!(ErrorKind::FolderAbsent(target.name().clone())),
            }
        };
        tracing::debug!(%folder_id, "Uploading");
        let content = std::fs::read(file.path()).map_err(ErrorKind::Io)?;
        self.store.upload_file(&folder_id, file.name(), &content).or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(%folder_id, bytes = content.len(), "Uploaded");
        Ok(())
    }
}
