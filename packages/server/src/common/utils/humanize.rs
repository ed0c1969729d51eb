use chrono::Duration;

/// Average days per month and per year over the 400-year Gregorian cycle.
const DAYS_PER_MONTH: f64 = 146_097.0 / 4_800.0;
const DAYS_PER_YEAR: f64 = 146_097.0 / 400.0;

/// Render a duration as a rough English phrase ("a few seconds", "3 hours", ...).
///
/// Each unit is rounded independently and the first unit under its threshold
/// wins:
/// - up to 44 seconds: "a few seconds"
/// - minutes: 1 → "a minute", under 45 → "N minutes"
/// - hours: 1 → "an hour", under 22 → "N hours"
/// - days: 1 → "a day", under 26 → "N days"
/// - months: 1 → "a month", under 11 → "N months"
/// - years: 1 → "a year", otherwise "N years"
///
/// The sign is ignored.
pub fn humanize_duration(duration: Duration) -> String {
    let secs = duration.num_milliseconds().unsigned_abs() as f64 / 1000.0;
    let days = secs / 86_400.0;

    let seconds = secs.round();
    let minutes = (secs / 60.0).round();
    let hours = (secs / 3_600.0).round();
    let whole_days = days.round();
    let months = (days / DAYS_PER_MONTH).round();
    let years = (days / DAYS_PER_YEAR).round();

    if seconds <= 44.0 {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if whole_days <= 1.0 {
        "a day".to_string()
    } else if whole_days < 26.0 {
        format!("{} days", whole_days)
    } else if months <= 1.0 {
        "a month".to_string()
    } else if months < 11.0 {
        format!("{} months", months)
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    }
}

/// File size in whole kilobytes (1 KB = 1000 bytes), rounded: `"12 KB"`
pub fn format_kilobytes(bytes: u64) -> String {
    format!("{} KB", (bytes as f64 / 1000.0).round())
}
