//! Persisted shapes of the click log and session index.
//!
//! Field names are fixed by previously stored data, so they are kept apart
//! from the in-memory models and converted with validation.

use std::convert::TryFrom;

use anyhow::{bail, Error, Result};
use serde::{Deserialize, Serialize};

use crate::db::helpers::{from_millis, to_millis};
use crate::models::{ClickEvent, Session};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    pub x: f64,
    pub y: f64,
    pub value: f64,
    pub timestamp: i64,
    pub session_id: String,
    pub ip: String,
}

impl From<&ClickEvent> for ClickRecord {
    fn from(click: &ClickEvent) -> Self {
        Self {
            x: click.x,
            y: click.y,
            value: click.value,
            timestamp: to_millis(click.timestamp),
            session_id: click.session_id.clone(),
            ip: click.ip.clone(),
        }
    }
}

impl TryFrom<ClickRecord> for ClickEvent {
    type Error = Error;

    fn try_from(record: ClickRecord) -> Result<Self> {
        let click = ClickEvent {
            x: record.x,
            y: record.y,
            value: record.value,
            timestamp: from_millis(record.timestamp, "timestamp")?,
            session_id: record.session_id,
            ip: record.ip,
        };
        click.validate().map_err(Error::msg)?;
        Ok(click)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Written for readers of the raw data; recomputed from the bounds on load.
    #[serde(default)]
    pub duration: i64,
    pub ip: String,
    #[serde(default)]
    pub click_count: u64,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            start_time: to_millis(session.start_time),
            end_time: to_millis(session.end_time),
            duration: session.duration().num_milliseconds(),
            ip: session.ip.clone(),
            click_count: session.click_count,
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = Error;

    fn try_from(record: SessionRecord) -> Result<Self> {
        if record.end_time < record.start_time {
            bail!(
                "session {} ends ({}) before it starts ({})",
                record.session_id,
                record.end_time,
                record.start_time
            );
        }

        Ok(Session {
            session_id: record.session_id,
            start_time: from_millis(record.start_time, "startTime")?,
            end_time: from_millis(record.end_time, "endTime")?,
            ip: record.ip,
            click_count: record.click_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_duration_is_recomputed_not_trusted() {
        let raw = r#"{"sessionId":"s1","startTime":1000,"endTime":3000,"duration":999999,"ip":"1.2.3.4"}"#;
        let record: SessionRecord = serde_json::from_str(raw).unwrap();
        let session = Session::try_from(record).unwrap();
        assert_eq!(session.duration_ms(), 2_000);
        assert_eq!(session.click_count, 0);
    }

    #[test]
    fn session_without_duration_still_loads() {
        let raw = r#"{"sessionId":"s1","startTime":1000,"endTime":4000,"ip":"1.2.3.4"}"#;
        let record: SessionRecord = serde_json::from_str(raw).unwrap();
        let session = Session::try_from(record).unwrap();
        assert_eq!(session.duration_ms(), 3_000);
    }

    #[test]
    fn session_ending_before_start_is_rejected() {
        let record = SessionRecord {
            session_id: "s1".into(),
            start_time: 5_000,
            end_time: 1_000,
            duration: -4_000,
            ip: "unknown".into(),
            click_count: 0,
        };
        assert!(Session::try_from(record).is_err());
    }

    #[test]
    fn click_with_negative_value_is_rejected() {
        let raw = r#"{"x":1,"y":2,"value":-3,"timestamp":10,"sessionId":"s","ip":"unknown"}"#;
        let record: ClickRecord = serde_json::from_str(raw).unwrap();
        assert!(ClickEvent::try_from(record).is_err());
    }

    #[test]
    fn click_record_keeps_wire_field_names() {
        let click = ClickEvent {
            x: 1.5,
            y: 2.0,
            value: 3.0,
            timestamp: from_millis(42, "timestamp").unwrap(),
            session_id: "abc".into(),
            ip: "unknown".into(),
        };
        let json = serde_json::to_value(ClickRecord::from(&click)).unwrap();
        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["timestamp"], 42);
        assert!(json.get("session_id").is_none());
    }
}
