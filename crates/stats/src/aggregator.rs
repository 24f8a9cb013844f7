//! Grouping of secured file summaries into batches.

use crate::reporter::ReporterHandle;
use hoard_securing::SecuredFileSummary;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

/// Collects secured file summaries into batches and hands each batch to a
/// [`StatsReporter`](crate::StatsReporter).
///
/// A batch is released as soon as it holds `batch_size` summaries, or once
/// `group_timeout` has passed since its first summary arrived, whichever
/// happens first. Whatever is left when the input channel closes is
/// released as a final, partial batch.
pub struct BatchAggregator {
    batch_size: usize,
    group_timeout: Duration,
    reporter: ReporterHandle,
}

impl BatchAggregator {
    pub fn new(batch_size: usize, group_timeout: Duration, reporter: ReporterHandle) -> Self {
        Self { batch_size: batch_size.max(1), group_timeout, reporter }
    }

    /// Consume summaries until every sender has been dropped.
    pub async fn run(self, mut summaries: mpsc::UnboundedReceiver<SecuredFileSummary>) {
        let mut group = Vec::with_capacity(self.batch_size);
        let mut deadline: Option<Instant> = None;
        loop {
            tokio::select! {
                received = summaries.recv() => match received {
                    Some(summary) => {
                        if group.is_empty() {
                            deadline = Some(Instant::now() + self.group_timeout);
                        }
                        group.push(summary);
                        if group.len() >= self.batch_size {
                            self.release(&mut group, "size");
                            deadline = None;
                        }
                    },
                    None => break,
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.release(&mut group, "timeout");
                    deadline = None;
                },
            }
        }
        if !group.is_empty() {
            self.release(&mut group, "shutdown");
        }
    }

    fn release(&self, group: &mut Vec<SecuredFileSummary>, trigger: &'static str) {
        let batch = std::mem::take(group);
        tracing::debug!(count = batch.len(), trigger, "Releasing batch of secured files");
        if let Err(error) = self.reporter.report_stats_for_secured_files(&batch) {
            tracing::warn!(?error, "Failed to report stats for secured files");
        }
    }
}
