use chrono::{DateTime, Local, Utc};

/// Renders a duration as `"1h 1m 1s"`, `"1m 5s"` or `"5s"`.
///
/// Minutes and hours are derived from the floored second count so the units
/// always agree with each other.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Local wall-clock rendering of an instant for display next to sessions.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
