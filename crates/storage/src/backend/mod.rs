//! Remote store trait and implementations.
//!
//! This module defines the `RemoteStore` trait, which provides a unified
//! interface over hierarchical remote stores (a folder tree on a mounted
//! share, a cloud drive, an in-memory fake for tests).
//!

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod retrying;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{Fault, MockBackend, Operation};
pub use self::retrying::RetryingBackend;
use crate::error::Result;
use crate::models::{FolderId, RemoteFolder};

/// Unified interface for remote folder stores.
///
/// All operations are **blocking**: callers that live on an async runtime
/// are expected to run them on a blocking thread. Transient failures are
/// reported as [`RateLimited`](crate::error::ErrorKind::RateLimited) or
/// [`Network`](crate::error::ErrorKind::Network) so that
/// [`RetryingBackend`] can tell them apart from permanent ones.
///
/// The store must have a folder/parent-child containment model: every
/// folder other than a root has exactly one parent, and names are unique
/// amongst siblings.
///
/// # Examples
///
/// ```
/// use hoard_storage::{RemoteStore, error::Result};
///
/// fn count_daily_folders(store: &dyn RemoteStore, root: &str) -> Result<usize> {
///     let root = store.get_root_folder(root)?;
///     Ok(store.child_folders_of(&root)?.len())
/// }
/// ```
pub trait RemoteStore: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Resolve a top-level folder by name.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if no such
    /// folder exists.
    fn get_root_folder(&self, name: &str) -> Result<RemoteFolder>;

    /// List the folders directly beneath `folder`.
    ///
    /// Files are not included, nor are folders further down the tree.
    fn child_folders_of(&self, folder: &RemoteFolder) -> Result<Vec<RemoteFolder>>;

    /// Create a folder called `name` beneath the folder identified by
    /// `parent`, returning its handle.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the parent
    /// does not exist, and may return
    /// [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if a folder
    /// with that name is already there. Stores that allow duplicate names
    /// will happily create a second one; callers must not rely on this call
    /// to deduplicate.
    fn create_child_folder(&self, parent: &FolderId, name: &str) -> Result<RemoteFolder>;

    /// Delete a folder and everything in it.
    fn delete_folder(&self, folder: &RemoteFolder) -> Result<()>;

    /// Upload `content` as a file called `file_name` into the folder
    /// identified by `parent`, replacing any file of the same name.
    fn upload_file(&self, parent: &FolderId, file_name: &str, content: &[u8]) -> Result<()>;
}
