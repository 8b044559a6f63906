const MS_PER_SECOND: u64 = 1000;

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Formats elapsed milliseconds as words, flooring to the whole second.
pub fn format_duration(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / MS_PER_SECOND;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::format_duration;

    #[test]
    fn floors_to_whole_seconds() {
        assert_eq!(format_duration(1250), "1 second");
        assert_eq!(format_duration(2999), "2 seconds");
    }

    #[test]
    fn sub_second_reports_zero_seconds() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(999), "0 seconds");
    }

    #[test]
    fn composes_hours_and_minutes() {
        assert_eq!(format_duration(65_000), "1 minute 5 seconds");
        assert_eq!(format_duration(3_600_000), "1 hour");
        assert_eq!(format_duration(7_322_000), "2 hours 2 minutes 2 seconds");
    }
}
