//! Presentation helpers: unit-scaled numbers and timestamps.

use chrono::{DateTime, Local};

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = 1024.0 * 1024.0 * 1024.0;

const SECOND_MS: f64 = 1000.0;
const MINUTE_MS: f64 = 60.0 * SECOND_MS;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;

/// Placeholder shown for a missing point
pub const NO_DATA: &str = "--";

/// Format a byte count with `prec` decimals in the largest unit above 1.
pub fn format_bytes(n: f64, prec: usize) -> String {
    if n <= 0.0 {
        return "0 B".to_string();
    }

    if n / GB > 1.0 {
        format!("{:.*} GB", prec, n / GB)
    } else if n / MB > 1.0 {
        format!("{:.*} MB", prec, n / MB)
    } else if n / KB > 1.0 {
        format!("{:.*} KB", prec, n / KB)
    } else {
        format!("{} B", n)
    }
}

/// Format a millisecond duration in the largest unit above 1.
pub fn format_millis(ms: f64) -> String {
    if ms <= 0.0 {
        return "0 ms".to_string();
    }

    if ms / HOUR_MS > 1.0 {
        format!("{:.2} h", ms / HOUR_MS)
    } else if ms / MINUTE_MS > 1.0 {
        format!("{:.2} m", ms / MINUTE_MS)
    } else if ms / SECOND_MS > 1.0 {
        format!("{:.2} s", ms / SECOND_MS)
    } else {
        format!("{} ms", ms)
    }
}

pub fn format_percent(v: f64, prec: usize) -> String {
    format!("{:.*}%", prec, v)
}

/// Time axis tick label (`HH:MM`, local time).
pub fn format_clock(timestamp_ms: i64) -> String {
    local_time(timestamp_ms)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| NO_DATA.to_string())
}

/// Time axis point label (`YYYY/MM/DD HH:MM:SS`, local time).
pub fn format_datetime(timestamp_ms: i64) -> String {
    local_time(timestamp_ms)
        .map(|t| t.format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|| NO_DATA.to_string())
}

fn local_time(timestamp_ms: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|t| t.with_timezone(&Local))
}

/// How a series' values are turned into text.
///
/// Kept as a plain tag so descriptors stay comparable and printable; the
/// functions are resolved from the tag at the point of use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatterKind {
    Percent,
    Bytes,
    Duration,
}

impl FormatterKind {
    /// Per-point formatter (legend, latest value).
    pub fn format_value(self, value: Option<f64>) -> String {
        let Some(v) = value else {
            return NO_DATA.to_string();
        };
        match self {
            FormatterKind::Percent => format_percent(v, 2),
            FormatterKind::Bytes => format_bytes(v, 2),
            FormatterKind::Duration => format_millis(v),
        }
    }

    /// Batch formatter for a set of axis ticks.
    pub fn format_ticks(self, ticks: &[f64]) -> Vec<String> {
        ticks
            .iter()
            .map(|&v| match self {
                FormatterKind::Percent => format_percent(v, 0),
                FormatterKind::Bytes => format_bytes(v, 0),
                FormatterKind::Duration => format_millis(v),
            })
            .collect()
    }
}
