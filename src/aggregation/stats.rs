use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ClickEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl TimeRange {
    pub fn is_single_point(&self) -> bool {
        self.earliest == self.latest
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickSummary {
    pub total_clicks: usize,
    pub time_range: Option<TimeRange>,
}

/// Earliest and latest timestamps in the set, or `None` when it is empty.
/// Log order is not assumed to be chronological.
pub fn time_range(clicks: &[ClickEvent]) -> Option<TimeRange> {
    let mut timestamps = clicks.iter().map(|click| click.timestamp);
    let first = timestamps.next()?;

    let (earliest, latest) = timestamps.fold((first, first), |(earliest, latest), ts| {
        (earliest.min(ts), latest.max(ts))
    });
    Some(TimeRange { earliest, latest })
}

pub fn summarize(clicks: &[ClickEvent]) -> ClickSummary {
    ClickSummary {
        total_clicks: clicks.len(),
        time_range: time_range(clicks),
    }
}
