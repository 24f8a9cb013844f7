use crate::clock::Clock;
use crate::events::DomainEventsNotifier;
use crate::models::{RemoteFolderName, SecuredFileSummary};
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    created: Mutex<Vec<String>>,
    secured: Mutex<Vec<SecuredFileSummary>>,
}
impl RecordingNotifier {
    pub(crate) fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn secured(&self) -> Vec<SecuredFileSummary> {
        self.secured.lock().unwrap().clone()
    }
}
impl DomainEventsNotifier for RecordingNotifier {
    fn notify_new_remote_daily_folder_created(&self, name: &RemoteFolderName) {
        self.created.lock().unwrap().push(name.to_string());
    }

    fn notify_file_secured(&self, summary: SecuredFileSummary) {
        self.secured.lock().unwrap().push(summary);
    }
}

/// Returns `start`, then moves forward by `step` on every call.
pub(crate) struct SteppingClock {
    next: Mutex<OffsetDateTime>,
    step: Duration,
}
impl SteppingClock {
    pub(crate) fn new(start: OffsetDateTime, step: Duration) -> Self {
        Self { next: Mutex::new(start), step }
    }
}
impl Clock for SteppingClock {
    fn now(&self) -> OffsetDateTime {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next += self.step;
        now
    }
}
