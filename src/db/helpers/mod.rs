use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn from_millis(value: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| anyhow!("{field} value {value} is out of range"))
}

pub fn to_millis(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

/// Parses the stringified integer milliseconds used for scalar timestamps.
pub fn parse_millis(value: &str, field: &str) -> Result<DateTime<Utc>> {
    let millis: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("failed to parse {field}"))?;
    from_millis(millis, field)
}
