//! Duration formatting for log entries and totals

/// Formats a number of minutes as `XhYm`, `Xh` or `Ym`
///
/// Negative inputs are clamped to zero.
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    let mins = minutes % 60;

    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h{}m", h, m),
    }
}

/// Formats minutes in a fixed-width column for tabular output
pub fn format_duration_tabular(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{:>4}h {:02}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_and_minutes() {
        assert_eq!(format_duration(90), "1h30m");
    }

    #[test]
    fn whole_hours() {
        assert_eq!(format_duration(180), "3h");
    }

    #[test]
    fn minutes_only() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(0), "0m");
    }

    #[test]
    fn negative_is_clamped() {
        assert_eq!(format_duration(-5), "0m");
    }

    #[test]
    fn tabular() {
        assert_eq!(format_duration_tabular(125), "   2h 05m");
    }
}
