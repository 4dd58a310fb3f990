pub mod aggregation;
pub mod cli;
pub mod db;
pub mod error;
pub mod models;
mod recorder;
pub mod session;
pub mod settings;
mod utils;
pub mod view;

use clap::Parser;

pub use aggregation::{
    filter_clicks_by_session, format_duration, group_sessions_by_client, normalize_for_heatmap,
    time_range, HeatmapPoint, SessionSelection, TimeRange,
};
pub use db::{AnalyticsStore, Database, KeyedStore, MemoryBackend, StoreUpdate};
pub use error::{AnalyticsError, Result};
pub use models::{ClickEvent, OpenSession, Session, SessionGroup};
pub use session::{MissingSessionPolicy, SessionManager, SessionState};
pub use view::AnalyticsView;

/// Client identifier used when none has been recorded.
pub const DEFAULT_CLIENT_IP: &str = "unknown";

pub fn run() -> anyhow::Result<()> {
    let debug_mode = std::env::var("CLICKMAP_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // RUST_LOG still takes precedence over the default level
    let default_level = if debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    log::debug!("clickmap starting up...");

    cli::execute(cli::Cli::parse())
}
