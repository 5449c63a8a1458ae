//! Formatting helpers for tooltip text.

use chrono::{DateTime, Utc};
use std::time::Duration;

const MAX_TITLE_LENGTH: usize = 60;
const MAX_DESCRIPTION_LENGTH: usize = 200;

/// Truncate to `max` characters, ending with an ellipsis when cut.
pub fn truncate(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn title(input: &str) -> String {
    truncate(input.trim(), MAX_TITLE_LENGTH)
}

pub fn description(input: &str) -> String {
    truncate(input.trim(), MAX_DESCRIPTION_LENGTH)
}

/// `1234567` → `1,234,567`.
pub fn number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `5_500_000` → `5.2 MB`.
pub fn bytes(n: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if n < 1024 {
        return format!("{n} B");
    }
    let mut value = n as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `H:MM:SS`, or `M:SS` under an hour.
pub fn duration(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// `02 Jan 2006 • 15:04 UTC`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%d %b %Y • %H:%M UTC").to_string()
}
