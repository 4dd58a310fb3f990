//! Read-only projections over the session index and click log.

pub mod format;
pub mod grouping;
pub mod heatmap;
pub mod selection;
pub mod stats;

pub use format::{format_duration, format_timestamp};
pub use grouping::{find_session, group_sessions_by_client};
pub use heatmap::{normalize_for_heatmap, HeatmapPayload, HeatmapPoint, HEATMAP_MAX};
pub use selection::{filter_clicks_by_session, SessionSelection};
pub use stats::{summarize, time_range, ClickSummary, TimeRange};
