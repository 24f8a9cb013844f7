use crate::models::{RemoteFolderName, SecuredFileSummary};
use std::sync::Arc;

/// Receives domain events raised while securing files.
///
/// Implementations must not block: events are raised from the upload path.
pub trait DomainEventsNotifier: Send + Sync {
    fn notify_new_remote_daily_folder_created(&self, name: &RemoteFolderName);

    fn notify_file_secured(&self, summary: SecuredFileSummary);
}

pub type NotifierHandle = Arc<dyn DomainEventsNotifier>;
