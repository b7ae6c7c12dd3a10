//! Shared utilities for CLI commands

use std::time::Duration;

/// Format an age as a compact duration ("12m", "3h 05m")
pub fn format_age(age: Duration) -> String {
    let seconds = age.as_secs();

    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h {:02}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {:02}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

/// Format a unix-millisecond timestamp relative to now ("2h 00m ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    let elapsed_ms = chrono::Utc::now().timestamp_millis() - ts_ms as i64;
    if elapsed_ms < 0 {
        return "in the future".to_string();
    }
    format!("{} ago", format_age(Duration::from_millis(elapsed_ms as u64)))
}

/// Pluralize a count ("1 granule", "3 granules")
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(42)), "42s");
        assert_eq!(format_age(Duration::from_secs(600)), "10m");
        assert_eq!(format_age(Duration::from_secs(3 * 3600 + 5 * 60)), "3h 05m");
        assert_eq!(format_age(Duration::from_secs(2 * 86400 + 3600)), "2d 01h");
    }

    #[test]
    fn test_format_relative_time() {
        let now_ms = chrono::Utc::now().timestamp_millis() as u64;
        assert_eq!(format_relative_time(now_ms - 2 * 3600 * 1000), "2h 00m ago");
        assert_eq!(format_relative_time(now_ms + 3600 * 1000), "in the future");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "granule"), "1 granule");
        assert_eq!(plural(0, "granule"), "0 granules");
    }
}
