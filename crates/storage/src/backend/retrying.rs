//! Retrying remote store.
//!
//! Wraps another backend and runs every call through a
//! [`RetryingExecutor`], so transient failures (rate limiting, dropped
//! connections) are retried with exponential back-off until a per-call time
//! budget runs out.

use crate::error::{ErrorKind, Result};
use crate::{FolderId, RemoteFolder, RemoteStore, StoreHandle};
use hoard_retry::error::ErrorKind as RetryErrorKind;
use hoard_retry::{Blocker, RetryingExecutor, ThreadBlocker};
use std::time::Duration;

/// Remote store decorator that retries transient failures.
///
/// Errors for which [`ErrorKind::is_retryable`] returns `true` are retried.
/// Anything else surfaces immediately as [`ErrorKind::NonRetryable`], and a
/// call that is still failing transiently when its budget runs out surfaces
/// as [`ErrorKind::Timeout`]. The underlying error is kept in the error tree
/// in both cases.
pub struct RetryingBackend<B = ThreadBlocker> {
    inner: StoreHandle,
    executor: RetryingExecutor<B>,
    timeout: Duration,
}
impl RetryingBackend {
    pub fn new(inner: StoreHandle, timeout: Duration) -> Self {
        Self::with_executor(inner, RetryingExecutor::new(), timeout)
    }
}
impl<B: Blocker> RetryingBackend<B> {
    pub fn with_executor(inner: StoreHandle, executor: RetryingExecutor<B>, timeout: Duration) -> Self {
        Self { inner, executor, timeout }
    }

    fn call<T>(&self, operation: &'static str, action: impl FnMut() -> Result<T>) -> Result<T> {
        let timeout = self.timeout;
        let on_expire = || tracing::error!(operation, backend = self.inner.name(), ?timeout, "Giving up on remote call");
        self.executor.retry(timeout, ErrorKind::is_retryable, on_expire, action).map_err(|err| {
            let kind = match &*err {
                RetryErrorKind::Expired { timeout, .. } => ErrorKind::Timeout(*timeout),
                RetryErrorKind::NonRetryable { .. } => ErrorKind::NonRetryable,
            };
            err.raise(kind)
        })
    }
}

impl<B: Blocker> RemoteStore for RetryingBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get_root_folder(&self, name: &str) -> Result<RemoteFolder> {
        self.call("get_root_folder", || self.inner.get_root_folder(name))
    }

    fn child_folders_of(&self, folder: &RemoteFolder) -> Result<Vec<RemoteFolder>> {
        self.call("child_folders_of", || self.inner.child_folders_of(folder))
    }

    fn create_child_folder(&self, parent: &FolderId, name: &str) -> Result<RemoteFolder> {
        self.call("create_child_folder", || self.inner.create_child_folder(parent, name))
    }

    fn delete_folder(&self, folder: &RemoteFolder) -> Result<()> {
        self.call("delete_folder", || self.inner.delete_folder(folder))
    }

    fn upload_file(&self, parent: &FolderId, file_name: &str, content: &[u8]) -> Result<()> {
        self.call("upload_file", || self.inner.upload_file(parent, file_name, content))
    }
}
