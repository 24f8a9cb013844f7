//! Polling watcher for the monitored directory.

use async_stream::stream;
use futures::Stream;
use regex::Regex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type Claimed = Arc<Mutex<HashSet<PathBuf>>>;

/// Polls a directory for files whose names match a pattern.
///
/// Each path is handed out once, then held until it is
/// [released](Releaser::release): a file that failed to secure is released
/// so that a later poll picks it up again, and a file that was secured and
/// deleted is released so that a new file of the same name is not ignored.
pub struct DirectoryWatcher {
    dir: PathBuf,
    pattern: Regex,
    interval: Duration,
    max_per_poll: usize,
    claimed: Claimed,
}

/// Hands paths claimed by a [`DirectoryWatcher`] back to it.
#[derive(Clone, Default)]
pub struct Releaser {
    claimed: Claimed,
}
impl Releaser {
    pub fn release(&self, path: &Path) {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner).remove(path);
    }

    #[cfg(test)]
    pub(crate) fn claim(&self, path: &Path) {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner).insert(path.to_path_buf());
    }

    #[cfg(test)]
    pub(crate) fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner).contains(path)
    }
}

impl DirectoryWatcher {
    pub fn new(dir: impl Into<PathBuf>, pattern: Regex, interval: Duration, max_per_poll: usize) -> Self {
        Self {
            dir: dir.into(),
            pattern,
            interval,
            max_per_poll: max_per_poll.max(1),
            claimed: Claimed::default(),
        }
    }

    pub fn releaser(&self) -> Releaser {
        Releaser { claimed: self.claimed.clone() }
    }

    /// List unclaimed matching files, newest name first, and claim them.
    pub async fn poll(&self) -> io::Result<Vec<PathBuf>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if self.pattern.is_match(&name) {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let mut paths = Vec::new();
        for name in names {
            if paths.len() == self.max_per_poll {
                break;
            }
            let path = self.dir.join(name);
            if claimed.insert(path.clone()) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Poll at the configured interval until `cancel` fires, yielding every
    /// newly claimed path.
    pub fn into_stream(self, cancel: CancellationToken) -> impl Stream<Item = PathBuf> + Send {
        stream! {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {},
                }
                match self.poll().await {
                    Ok(paths) => {
                        if !paths.is_empty() {
                            tracing::debug!(count = paths.len(), dir = %self.dir.display(), "Discovered files");
                        }
                        for path in paths {
                            yield path;
                        }
                    },
                    Err(error) => tracing::warn!(%error, dir = %self.dir.display(), "Failed to poll monitored directory"),
                }
            }
            tracing::debug!(dir = %self.dir.display(), "Stopped watching");
        }
    }
}
