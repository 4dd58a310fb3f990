use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    NoSession,
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NoSession => "NoSession",
            SessionStatus::Open => "Open",
            SessionStatus::Closed => "Closed",
        }
    }
}

/// The single session currently accepting clicks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSession {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub ip: String,
}

impl OpenSession {
    /// Freezes the session at `end_time`. An end earlier than the start is
    /// clamped so the duration is never negative.
    pub fn close(self, end_time: DateTime<Utc>, click_count: u64) -> Session {
        Session {
            session_id: self.session_id,
            end_time: end_time.max(self.start_time),
            start_time: self.start_time,
            ip: self.ip,
            click_count,
        }
    }
}

/// A closed session as stored in the session index. Never mutated once closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub ip: String,
    /// Clicks that were in the log when the session was closed.
    pub click_count: u64,
}

impl Session {
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().num_milliseconds().max(0) as u64
    }
}

/// Closed sessions from one client, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGroup {
    pub ip: String,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub ip: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub click_count: u64,
    pub status: SessionStatus,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            ip: session.ip.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            duration_ms: session.duration_ms(),
            click_count: session.click_count,
            status: SessionStatus::Closed,
        }
    }
}
