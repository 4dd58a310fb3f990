use serde::{Deserialize, Serialize};

use crate::models::{OpenSession, SessionStatus};

/// What `record` does when no session is open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MissingSessionPolicy {
    /// Open a fresh session and record into it.
    AutoStart,
    /// Fail with `AnalyticsError::UninitializedSession`.
    Reject,
}

impl Default for MissingSessionPolicy {
    fn default() -> Self {
        MissingSessionPolicy::AutoStart
    }
}

/// Lifecycle position of a recorder instance. `Closed` is transient: a reset
/// closes the open session and immediately opens the next one, so it is only
/// ever observed through the closed `Session` that reset returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Open(OpenSession),
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::NoSession
    }
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::NoSession => SessionStatus::NoSession,
            SessionState::Open(_) => SessionStatus::Open,
        }
    }

    pub fn open_session(&self) -> Option<&OpenSession> {
        match self {
            SessionState::Open(session) => Some(session),
            SessionState::NoSession => None,
        }
    }
}

impl From<Option<OpenSession>> for SessionState {
    fn from(session: Option<OpenSession>) -> Self {
        session.map_or(SessionState::NoSession, SessionState::Open)
    }
}
