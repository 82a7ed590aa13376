//! Interval arithmetic and duration formatting.

use chrono::{DateTime, Duration, Utc};

/// Returns the time elapsed from `start` to `end`.
///
/// The result is signed: if `end` precedes `start` (events from an external
/// clock can arrive that way) the duration is negative.
pub fn elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    end - start
}

/// Formats a duration as `H:MM:SS`.
///
/// Hours are unbounded, sub-second remainders are truncated and negative
/// durations get a leading `-`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.num_milliseconds();
    let total_seconds = (ms / 1000).unsigned_abs();
    let sign = if ms < 0 && total_seconds > 0 { "-" } else { "" };

    let hours = total_seconds / 3600;
    let minutes = total_seconds % 3600 / 60;
    let seconds = total_seconds % 60;
    format!("{sign}{hours}:{minutes:02}:{seconds:02}")
}
