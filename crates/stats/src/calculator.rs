use crate::error::{ErrorKind, Result};
use hoard_securing::SecuredFileSummary;
use time::{Duration, OffsetDateTime};

/// Aggregate figures for one batch of secured files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredFilesBatchStats {
    pub files_count: usize,
    /// Earliest upload start in the batch
    pub start: OffsetDateTime,
    /// Latest upload end in the batch
    pub end: OffsetDateTime,
    pub total_files_size_in_bytes: u64,
}

impl SecuredFilesBatchStats {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Bytes secured per whole second of the batch's duration.
    ///
    /// `None` when the batch took less than a second, since there is no
    /// whole second to divide by.
    pub fn throughput_bytes_per_sec(&self) -> Option<u64> {
        match u64::try_from(self.duration().whole_seconds()) {
            Ok(0) | Err(_) => None,
            Ok(seconds) => Some(self.total_files_size_in_bytes / seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatsCalculator;

impl StatsCalculator {
    /// Summarise a batch of secured files.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::EmptyBatch`] if `summaries` is empty.
    pub fn calculate_stats_for(&self, summaries: &[SecuredFileSummary]) -> Result<SecuredFilesBatchStats> {
        let (Some(start), Some(end)) = (
            summaries.iter().map(|summary| summary.upload_start).min(),
            summaries.iter().map(|summary| summary.upload_end).max(),
        ) else {
            exn::bail!(ErrorKind::EmptyBatch);
        };
        Ok(SecuredFilesBatchStats {
            files_count: summaries.len(),
            start,
            end,
            total_files_size_in_bytes: summaries.iter().map(|summary| summary.secured_file.size_in_bytes()).sum(),
        })
    }
}
