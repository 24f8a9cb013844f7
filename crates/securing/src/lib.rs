//! Securing local files into dated remote folders.
//!
//! A file dated 2019-08-18 is uploaded into the remote daily folder
//! `2019-08-18` beneath a configured root folder. [`Securer`] makes sure
//! the folder exists and uploads into it, [`Janitor`] keeps the number of
//! daily folders within the configured limit and removes local files once
//! they have been secured.

mod clock;
pub mod error;
mod events;
mod janitor;
mod models;
mod securer;
mod storage;
#[cfg(test)]
mod testing;

pub use crate::clock::{Clock, ClockHandle, SystemClock};
pub use crate::events::{DomainEventsNotifier, NotifierHandle};
pub use crate::janitor::Janitor;
pub use crate::models::{DateSource, LocalFile, RemoteDailyFolder, RemoteFolderName, SecuredFileSummary};
pub use crate::securer::Securer;
pub use crate::storage::{DailyFolderStorage, RemoteStorageService, StorageServiceHandle};
