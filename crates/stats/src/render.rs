//! Rendering batch stats as log lines.

use crate::calculator::SecuredFilesBatchStats;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const BINARY_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
const RULE: &str = "---------------------------------------";

pub trait StatsLogRenderer: Send + Sync {
    fn render(&self, stats: &SecuredFilesBatchStats) -> Vec<String>;
}

/// Renders stats as a right-aligned block of labelled lines between two
/// horizontal rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanReadableStatsRenderer;

impl StatsLogRenderer for HumanReadableStatsRenderer {
    fn render(&self, stats: &SecuredFilesBatchStats) -> Vec<String> {
        let speed = match stats.throughput_bytes_per_sec() {
            Some(bytes) => format!("{}/s", format_byte_size(bytes)),
            None => "n/a".to_string(),
        };
        vec![
            RULE.to_string(),
            format!("   Secured files: {}", stats.files_count),
            format!(" Upload duration: {}", format_duration(stats.duration())),
            format!("     Upload size: {}", format_byte_size(stats.total_files_size_in_bytes)),
            format!("    Upload speed: {speed}"),
            format!("    Upload start: {}", format_instant(stats.start)),
            format!("      Upload end: {}", format_instant(stats.end)),
            RULE.to_string(),
        ]
    }
}

/// Binary units with at most one decimal place, e.g. `983 B`, `58.6 KiB`,
/// `1,023 KiB`.
pub fn format_byte_size(bytes: u64) -> String {
    let mut unit = 0;
    // Precision loss only matters beyond 2^53 bytes, and only in the tenths.
    let mut scaled = bytes as f64;
    // Compare after rounding, so 1023.96 KiB moves up to 1 MiB.
    while (scaled * 10.0).round() >= 10_240.0 && unit < BINARY_UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }
    let tenths = (scaled * 10.0).round() as u64;
    match (tenths / 10, tenths % 10) {
        (whole, 0) => format!("{} {}", group_thousands(whole), BINARY_UNITS[unit]),
        (whole, fraction) => format!("{}.{} {}", group_thousands(whole), fraction, BINARY_UNITS[unit]),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// `HH:mm:ss.SSS`; hours keep counting past 24. Negative durations render
/// as zero.
pub fn format_duration(duration: Duration) -> String {
    let millis = u128::try_from(duration.whole_milliseconds()).unwrap_or_default();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000
    )
}

fn format_instant(instant: OffsetDateTime) -> String {
    instant.format(&Rfc3339).unwrap_or_else(|_| instant.to_string())
}
