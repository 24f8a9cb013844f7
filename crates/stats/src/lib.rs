//! Throughput statistics for batches of secured files.
//!
//! Secured file summaries flow into a [`BatchAggregator`], which groups them
//! by count or age and hands every group to a [`StatsReporter`]. The stock
//! reporter summarises the group with [`StatsCalculator`] and logs it
//! through a [`StatsLogRenderer`].

mod aggregator;
mod calculator;
pub mod error;
mod render;
mod reporter;

pub use crate::aggregator::BatchAggregator;
pub use crate::calculator::{SecuredFilesBatchStats, StatsCalculator};
pub use crate::render::{HumanReadableStatsRenderer, StatsLogRenderer, format_byte_size, format_duration};
pub use crate::reporter::{LoggingStatsReporter, ReporterHandle, StatsReporter};
