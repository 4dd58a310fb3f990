use thiserror::Error;

/// Failures surfaced by the analytics core.
///
/// Corrupt persisted state is deliberately absent: the store recovers from it
/// locally by loading an empty collection.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A click was recorded with no open session under `MissingSessionPolicy::Reject`.
    #[error("no open session to record the click into")]
    UninitializedSession,

    #[error("invalid click: {0}")]
    InvalidClick(String),

    /// The requested mutation targets the currently open session.
    #[error("session {0} is still open")]
    SessionOpen(String),

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
