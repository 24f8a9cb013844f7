//! Watches a directory and secures new files into dated remote folders.
//!
//! Every file that appears in the monitored directory is uploaded into a
//! daily folder named after the file's date, then deleted locally. Old daily
//! folders are rotated out so that no more than a configured number remain.

pub mod error;
pub mod logging;
pub mod pipeline;
pub mod watch;

use crate::error::{ErrorKind, Result};
use crate::pipeline::{ChannelNotifier, Pipeline};
use crate::watch::DirectoryWatcher;
use exn::ResultExt;
use hoard_config::Config;
use hoard_securing::{DailyFolderStorage, Janitor, RemoteStorageService, Securer, StorageServiceHandle, SystemClock};
use hoard_stats::{BatchAggregator, ReporterHandle};
use hoard_storage::StoreHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Secure files from the configured directory into `store` until `cancel`
/// fires, then drain in-flight work.
///
/// # Errors
///
/// Only startup can fail: an invalid pattern, or the remote root folder not
/// being resolvable. Failures while securing individual files are logged and
/// retried on a later poll.
pub async fn secure_directory(
    config: &Config,
    store: StoreHandle,
    reporter: ReporterHandle,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!(
        store = store.name(),
        dir = %config.monitoring.path.display(),
        root = %config.upload.root_folder_name,
        "Starting"
    );
    let daily_folder_pattern = config.daily_folder_regex().or_raise(|| ErrorKind::Config)?;
    let file_name_pattern = config.file_name_regex().or_raise(|| ErrorKind::Config)?;

    let storage: StorageServiceHandle =
        Arc::new(DailyFolderStorage::new(store, config.upload.root_folder_name.clone(), daily_folder_pattern));
    let janitor = Arc::new(Janitor::new(storage.clone(), config.rotation.max_daily_folders));
    {
        let storage = storage.clone();
        let janitor = janitor.clone();
        tokio::task::spawn_blocking(move || {
            storage.init()?;
            janitor.rotate_remote_daily_folders()
        })
        .await
        .map_err(|e| ErrorKind::Task(e.to_string()))?
        .or_raise(|| ErrorKind::Startup)?;
    }

    let (notifier, events) = ChannelNotifier::new();
    let securer = Securer::new(storage, Arc::new(notifier), Arc::new(SystemClock));
    let pipeline = Pipeline::new(
        securer,
        janitor,
        config.monitoring.date_source,
        config.upload.max_concurrent_uploads,
    );
    let watcher = DirectoryWatcher::new(
        &config.monitoring.path,
        file_name_pattern,
        config.polling_interval(),
        config.monitoring.max_files_per_poll,
    );
    let releaser = watcher.releaser();
    let aggregator = BatchAggregator::new(config.stats.batch_size, config.group_timeout(), reporter);

    pipeline.run(watcher.into_stream(cancel), releaser, events, aggregator).await;
    tracing::info!("Stopped");
    Ok(())
}
