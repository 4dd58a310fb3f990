use std::convert::TryFrom;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::{
    backend::{KeyValueBackend, KeyWrite},
    helpers::{parse_millis, to_millis},
    records::{ClickRecord, SessionRecord},
};
use crate::error::{AnalyticsError, Result};
use crate::models::{ClickEvent, OpenSession, Session};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Storage keys. Existing data is addressed by these exact names.
pub mod keys {
    pub const CLICK_LOG: &str = "userClickData";
    pub const SESSION_INDEX: &str = "sessionData";
    pub const CURRENT_SESSION_ID: &str = "currentSessionId";
    pub const SESSION_START_TIME: &str = "sessionStartTime";
    pub const CURRENT_IP: &str = "currentIP";
}

/// A set of writes committed together by `AnalyticsStore::apply`.
/// Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreUpdate {
    pub clicks: Option<Vec<ClickEvent>>,
    pub sessions: Option<Vec<Session>>,
    /// `Some(None)` clears the open session.
    pub current_session: Option<Option<OpenSession>>,
}

impl StoreUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(mut self, clicks: Vec<ClickEvent>) -> Self {
        self.clicks = Some(clicks);
        self
    }

    pub fn sessions(mut self, sessions: Vec<Session>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn current_session(mut self, session: Option<OpenSession>) -> Self {
        self.current_session = Some(session);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_none() && self.sessions.is_none() && self.current_session.is_none()
    }
}

/// Structured persistence for the analytics core.
///
/// Loads never fail on malformed data: a value that cannot be decoded is
/// treated as absent. Errors are reserved for the backend itself.
pub trait AnalyticsStore {
    fn load_clicks(&self) -> Result<Vec<ClickEvent>>;
    fn load_sessions(&self) -> Result<Vec<Session>>;
    /// The open session, if one is persisted. Its `ip` is the current client identifier.
    fn load_current_session(&self) -> Result<Option<OpenSession>>;
    fn load_client_ip(&self) -> Result<Option<String>>;

    /// Commits every part of `update` or none of it.
    fn apply(&mut self, update: StoreUpdate) -> Result<()>;

    fn save_client_ip(&mut self, ip: &str) -> Result<()>;

    fn save_clicks(&mut self, clicks: &[ClickEvent]) -> Result<()> {
        self.apply(StoreUpdate::new().clicks(clicks.to_vec()))
    }

    fn save_sessions(&mut self, sessions: &[Session]) -> Result<()> {
        self.apply(StoreUpdate::new().sessions(sessions.to_vec()))
    }

    fn save_current_session(&mut self, session: Option<&OpenSession>) -> Result<()> {
        self.apply(StoreUpdate::new().current_session(session.cloned()))
    }
}

/// `AnalyticsStore` laid out over a raw keyed backend as JSON values.
pub struct KeyedStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> KeyedStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_inner(self) -> B {
        self.backend
    }

    fn load_collection<R, T>(&self, key: &'static str) -> Result<Vec<T>>
    where
        R: DeserializeOwned,
        T: TryFrom<R, Error = anyhow::Error>,
    {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(Vec::new());
        };

        match decode_collection::<R, T>(&raw) {
            Ok(items) => Ok(items),
            Err(err) => {
                log_warn!("Discarding unreadable {key}: {err:#}");
                Ok(Vec::new())
            }
        }
    }
}

fn encode_collection<R: Serialize>(key: &'static str, records: &[R]) -> Result<String> {
    serde_json::to_string(records).map_err(|source| AnalyticsError::Encode { key, source })
}

fn decode_collection<R, T>(raw: &str) -> anyhow::Result<Vec<T>>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = anyhow::Error>,
{
    let records: Vec<R> = serde_json::from_str(raw).context("malformed JSON array")?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            T::try_from(record).with_context(|| format!("invalid entry at index {index}"))
        })
        .collect()
}

impl<B: KeyValueBackend> AnalyticsStore for KeyedStore<B> {
    fn load_clicks(&self) -> Result<Vec<ClickEvent>> {
        self.load_collection::<ClickRecord, ClickEvent>(keys::CLICK_LOG)
    }

    fn load_sessions(&self) -> Result<Vec<Session>> {
        self.load_collection::<SessionRecord, Session>(keys::SESSION_INDEX)
    }

    fn load_current_session(&self) -> Result<Option<OpenSession>> {
        let Some(session_id) = self
            .backend
            .get(keys::CURRENT_SESSION_ID)?
            .filter(|id| !id.trim().is_empty())
        else {
            return Ok(None);
        };

        let raw_start = self.backend.get(keys::SESSION_START_TIME)?;
        let start_time = match raw_start.as_deref().map(|raw| parse_millis(raw, keys::SESSION_START_TIME)) {
            Some(Ok(start_time)) => start_time,
            Some(Err(err)) => {
                log_warn!("Ignoring open session {session_id}: {err:#}");
                return Ok(None);
            }
            None => {
                log_warn!("Ignoring open session {session_id}: no start time persisted");
                return Ok(None);
            }
        };

        Ok(Some(OpenSession {
            session_id,
            start_time,
            ip: self.load_client_ip()?.unwrap_or_else(|| crate::DEFAULT_CLIENT_IP.to_string()),
        }))
    }

    fn load_client_ip(&self) -> Result<Option<String>> {
        Ok(self
            .backend
            .get(keys::CURRENT_IP)?
            .filter(|ip| !ip.trim().is_empty()))
    }

    fn apply(&mut self, update: StoreUpdate) -> Result<()> {
        let mut writes: Vec<(&'static str, Option<String>)> = Vec::new();

        if let Some(clicks) = &update.clicks {
            let records: Vec<ClickRecord> = clicks.iter().map(ClickRecord::from).collect();
            writes.push((keys::CLICK_LOG, Some(encode_collection(keys::CLICK_LOG, &records)?)));
        }
        if let Some(sessions) = &update.sessions {
            let records: Vec<SessionRecord> = sessions.iter().map(SessionRecord::from).collect();
            writes.push((
                keys::SESSION_INDEX,
                Some(encode_collection(keys::SESSION_INDEX, &records)?),
            ));
        }
        match &update.current_session {
            Some(Some(session)) => {
                writes.push((keys::CURRENT_SESSION_ID, Some(session.session_id.clone())));
                writes.push((
                    keys::SESSION_START_TIME,
                    Some(to_millis(session.start_time).to_string()),
                ));
                writes.push((keys::CURRENT_IP, Some(session.ip.clone())));
            }
            Some(None) => {
                writes.push((keys::CURRENT_SESSION_ID, None));
                writes.push((keys::SESSION_START_TIME, None));
            }
            None => {}
        }

        if writes.is_empty() {
            return Ok(());
        }

        let batch: Vec<KeyWrite<'_>> = writes
            .iter()
            .map(|(key, value)| (*key, value.as_deref()))
            .collect();
        self.backend.write_batch(&batch)?;

        if let Some(Some(session)) = &update.current_session {
            log_info!("Persisted open session {}", session.session_id);
        }
        Ok(())
    }

    fn save_client_ip(&mut self, ip: &str) -> Result<()> {
        self.backend.set(keys::CURRENT_IP, ip)?;
        Ok(())
    }
}
