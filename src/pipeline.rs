//! Wiring of discovery, uploads and event consumers.
//!
//! Discovery runs on a single task: each discovered file has its daily
//! folder ensured before the next file is looked at, so two files for the
//! same day can never race to create the same folder. When that creates a
//! folder, old folders are rotated out on the same path, once in-flight
//! uploads have finished, so rotation never deletes a folder an upload is
//! writing into. Uploads are then handed to blocking threads, at most
//! `max_concurrent_uploads` at a time. Secured-file events fan out over
//! channels to independent consumers for local cleanup and stats.

use crate::watch::Releaser;
use futures::{Stream, StreamExt};
use hoard_securing::error::Error as SecuringError;
use hoard_securing::{DateSource, DomainEventsNotifier, Janitor, LocalFile, RemoteFolderName, SecuredFileSummary, Securer};
use hoard_stats::BatchAggregator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::instrument;

/// [`DomainEventsNotifier`] that forwards secured-file events to both the
/// cleanup and the stats consumer.
pub struct ChannelNotifier {
    cleanup: mpsc::UnboundedSender<SecuredFileSummary>,
    stats: mpsc::UnboundedSender<SecuredFileSummary>,
}

/// Receiving ends of a [`ChannelNotifier`].
pub struct Events {
    cleanup: mpsc::UnboundedReceiver<SecuredFileSummary>,
    stats: mpsc::UnboundedReceiver<SecuredFileSummary>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, Events) {
        let (cleanup_tx, cleanup) = mpsc::unbounded_channel();
        let (stats_tx, stats) = mpsc::unbounded_channel();
        (Self { cleanup: cleanup_tx, stats: stats_tx }, Events { cleanup, stats })
    }
}

impl DomainEventsNotifier for ChannelNotifier {
    fn notify_new_remote_daily_folder_created(&self, name: &RemoteFolderName) {
        // Rotation follows on the discovery path.
        tracing::debug!(folder = %name, "Daily folder created");
    }

    fn notify_file_secured(&self, summary: SecuredFileSummary) {
        if self.stats.send(summary.clone()).is_err() {
            tracing::warn!(file = %summary.secured_file, "Stats consumer has gone away; dropping file secured event");
        }
        if self.cleanup.send(summary).is_err() {
            tracing::warn!("Cleanup consumer has gone away; dropping file secured event");
        }
    }
}

pub struct Pipeline {
    securer: Arc<Securer>,
    janitor: Arc<Janitor>,
    date_source: DateSource,
    uploads: Arc<Semaphore>,
}

impl Pipeline {
    /// `securer` must be the only holder of the [`ChannelNotifier`] whose
    /// [`Events`] are passed to [`run`](Self::run); the event consumers
    /// finish once it is dropped.
    pub fn new(securer: Securer, janitor: Arc<Janitor>, date_source: DateSource, max_concurrent_uploads: usize) -> Self {
        Self {
            securer: Arc::new(securer),
            janitor,
            date_source,
            uploads: Arc::new(Semaphore::new(max_concurrent_uploads.max(1))),
        }
    }

    /// Secure every file `files` yields, until it ends.
    ///
    /// Once it has ended, waits for in-flight uploads to finish and for every
    /// consumer to drain its events before returning.
    pub async fn run(
        self,
        files: impl Stream<Item = PathBuf>,
        releaser: Releaser,
        events: Events,
        aggregator: BatchAggregator,
    ) {
        let Events { cleanup, stats } = events;
        let consumers = [
            tokio::spawn(cleanup_on_file_secured(self.janitor.clone(), releaser.clone(), cleanup)),
            tokio::spawn(aggregator.run(stats)),
        ];

        let mut uploads = JoinSet::new();
        futures::pin_mut!(files);
        while let Some(path) = files.next().await {
            while let Some(joined) = uploads.try_join_next() {
                log_upload_task(joined);
            }
            let Some((file, created)) = self.prepare(path, &releaser).await else {
                continue;
            };
            if created && !self.rotate(&file, &mut uploads).await {
                continue;
            }
            // The semaphore is never closed.
            let Ok(permit) = self.uploads.clone().acquire_owned().await else {
                break;
            };
            let securer = self.securer.clone();
            let releaser = releaser.clone();
            uploads.spawn_blocking(move || {
                let _permit = permit;
                if let Err(error) = securer.secure(&file) {
                    tracing::warn!(%file, ?error, "Failed to secure file; leaving it for a later pass");
                    releaser.release(file.path());
                }
            });
        }

        tracing::info!(in_flight = uploads.len(), "Discovery stopped; waiting for uploads to finish");
        join_uploads(&mut uploads).await;
        // Dropping the last notifier closes the event channels.
        drop(self);
        for consumer in consumers {
            if let Err(error) = consumer.await {
                tracing::error!(%error, "Event consumer failed");
            }
        }
        tracing::info!("Pipeline drained");
    }

    /// Turn a discovered path into a [`LocalFile`] whose daily folder exists,
    /// and report whether that folder had to be created.
    ///
    /// Files that fail are released for a later pass when that could help,
    /// and otherwise stay claimed so they are not retried on every poll.
    #[instrument(skip_all, fields(path = %path.display()))]
    async fn prepare(&self, path: PathBuf, releaser: &Releaser) -> Option<(LocalFile, bool)> {
        let securer = self.securer.clone();
        let date_source = self.date_source;
        let candidate = path.clone();
        let ensured = tokio::task::spawn_blocking(move || -> Result<(LocalFile, bool), SecuringError> {
            let file = LocalFile::from_path(candidate, date_source)?;
            let created = securer.ensure_remote_daily_folder(&file)?;
            Ok((file, created))
        })
        .await;
        match ensured {
            Ok(Ok(prepared)) => Some(prepared),
            Ok(Err(error)) if error.is_retryable() => {
                tracing::warn!(?error, "Failed to prepare file; leaving it for a later pass");
                releaser.release(&path);
                None
            },
            Ok(Err(error)) => {
                tracing::error!(?error, "Cannot secure file; ignoring it until restart");
                None
            },
            Err(error) => {
                tracing::error!(%error, "File preparation task failed");
                releaser.release(&path);
                None
            },
        }
    }

    /// Rotate old daily folders out after `file`'s folder was created.
    ///
    /// Waits for in-flight uploads first. Returns `false` if `file`'s own
    /// folder was rotated out, in which case the file is older than anything
    /// worth keeping and stays claimed, untouched, until restart.
    #[instrument(skip_all, fields(file = %file))]
    async fn rotate(&self, file: &LocalFile, uploads: &mut JoinSet<()>) -> bool {
        if !uploads.is_empty() {
            tracing::debug!(in_flight = uploads.len(), "Waiting for uploads before rotating");
            join_uploads(uploads).await;
        }
        let janitor = self.janitor.clone();
        let securer = self.securer.clone();
        let target = file.clone();
        let rotated = tokio::task::spawn_blocking(move || {
            let rotated = janitor.rotate_remote_daily_folders();
            (rotated, securer.has_remote_daily_folder(&target))
        })
        .await;
        match rotated {
            Ok((rotated, retained)) => {
                if let Err(error) = rotated {
                    tracing::error!(?error, "Failed to rotate remote daily folders");
                }
                if !retained {
                    tracing::warn!("File is older than every retained daily folder; leaving it in place");
                }
                retained
            },
            Err(error) => {
                tracing::error!(%error, "Rotation task failed");
                true
            },
        }
    }
}

fn log_upload_task(joined: Result<(), tokio::task::JoinError>) {
    if let Err(error) = joined {
        tracing::error!(%error, "Upload task failed");
    }
}

async fn join_uploads(uploads: &mut JoinSet<()>) {
    while let Some(joined) = uploads.join_next().await {
        log_upload_task(joined);
    }
}

/// Delete each secured file, handing its path back to the watcher only once
/// it is gone. A file that cannot be deleted stays claimed so that it is not
/// secured again.
async fn cleanup_on_file_secured(
    janitor: Arc<Janitor>,
    releaser: Releaser,
    mut secured: mpsc::UnboundedReceiver<SecuredFileSummary>,
) {
    while let Some(summary) = secured.recv().await {
        let janitor = janitor.clone();
        let file = summary.secured_file;
        let cleaned = tokio::task::spawn_blocking(move || {
            let deleted = janitor.cleanup_secured_file(&file);
            (file, deleted)
        });
        match cleaned.await {
            Ok((file, true)) => releaser.release(file.path()),
            Ok((file, false)) => tracing::warn!(%file, "Keeping secured file claimed until restart"),
            Err(error) => tracing::error!(%error, "Cleanup task failed"),
        }
    }
}
