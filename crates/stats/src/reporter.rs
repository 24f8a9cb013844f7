use crate::calculator::StatsCalculator;
use crate::error::Result;
use crate::render::{HumanReadableStatsRenderer, StatsLogRenderer};
use hoard_securing::SecuredFileSummary;
use std::sync::Arc;

/// Receives each completed batch of secured files.
pub trait StatsReporter: Send + Sync {
    fn report_stats_for_secured_files(&self, summaries: &[SecuredFileSummary]) -> Result<()>;
}

pub type ReporterHandle = Arc<dyn StatsReporter>;

/// Reports batch stats by logging each rendered line at info level.
pub struct LoggingStatsReporter {
    calculator: StatsCalculator,
    renderer: Box<dyn StatsLogRenderer>,
}

impl LoggingStatsReporter {
    pub fn new(renderer: impl StatsLogRenderer + 'static) -> Self {
        Self { calculator: StatsCalculator, renderer: Box::new(renderer) }
    }
}

impl Default for LoggingStatsReporter {
    fn default() -> Self {
        Self::new(HumanReadableStatsRenderer)
    }
}

impl StatsReporter for LoggingStatsReporter {
    fn report_stats_for_secured_files(&self, summaries: &[SecuredFileSummary]) -> Result<()> {
        let stats = self.calculator.calculate_stats_for(summaries)?;
        for line in self.renderer.render(&stats) {
            tracing::info!("{line}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::SecuredFilesBatchStats;
    use crate::error::ErrorKind;
    use hoard_securing::LocalFile;
    use std::sync::Mutex;
    use time::macros::{date, datetime};

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<usize>>>);
    impl StatsLogRenderer for Recording {
        fn render(&self, stats: &SecuredFilesBatchStats) -> Vec<String> {
            self.0.lock().unwrap().push(stats.files_count);
            vec![format!("{} files", stats.files_count)]
        }
    }

    #[test]
    fn test_report_renders_batch() {
        let recording = Recording::default();
        let reporter = LoggingStatsReporter::new(recording.clone());
        let file = LocalFile::new("/spool/20190818.jpg", date!(2019 - 08 - 18), 10).unwrap();
        let summary =
            SecuredFileSummary::new(datetime!(2019-08-18 19:10:00 UTC), datetime!(2019-08-18 19:10:05 UTC), file);

        reporter.report_stats_for_secured_files(&[summary.clone(), summary]).unwrap();
        assert_eq!(*recording.0.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_report_empty_batch() {
        let recording = Recording::default();
        let reporter = LoggingStatsReporter::new(recording.clone());

        let err = reporter.report_stats_for_secured_files(&[]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyBatch));
        assert!(recording.0.lock().unwrap().is_empty());
    }
}
