use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    aggregation::format_duration,
    db::{AnalyticsStore, StoreUpdate},
    error::{AnalyticsError, Result},
    models::{ClickEvent, OpenSession, Session},
    settings::AnalyticsSettings,
    DEFAULT_CLIENT_IP,
};
use crate::{log_info, log_warn};

use super::{MissingSessionPolicy, SessionState};

const ENABLE_LOGS: bool = true;

/// Owns the session lifecycle and every write to the analytics store.
///
/// All state lives in the store; the manager itself only carries policy, so
/// two managers over the same store observe the same session.
pub struct SessionManager<S> {
    pub(crate) store: S,
    pub(crate) policy: MissingSessionPolicy,
    fallback_ip: String,
}

impl<S: AnalyticsStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: MissingSessionPolicy::default(),
            fallback_ip: DEFAULT_CLIENT_IP.to_string(),
        }
    }

    pub fn from_settings(store: S, settings: &AnalyticsSettings) -> Self {
        Self::new(store)
            .with_policy(settings.missing_session_policy)
            .with_fallback_ip(settings.fallback_client_ip.clone())
    }

    pub fn with_policy(mut self, policy: MissingSessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fallback_ip(mut self, ip: impl Into<String>) -> Self {
        self.fallback_ip = ip.into();
        self
    }

    pub fn policy(&self) -> MissingSessionPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn state(&self) -> Result<SessionState> {
        Ok(self.store.load_current_session()?.into())
    }

    pub fn current(&self) -> Result<Option<OpenSession>> {
        self.store.load_current_session()
    }

    /// The closed-session index, oldest first.
    pub fn sessions(&self) -> Result<Vec<Session>> {
        self.store.load_sessions()
    }

    /// The click log of the open session.
    pub fn clicks(&self) -> Result<Vec<ClickEvent>> {
        self.store.load_clicks()
    }

    pub fn client_ip(&self) -> Result<String> {
        Ok(self
            .store
            .load_client_ip()?
            .unwrap_or_else(|| self.fallback_ip.clone()))
    }

    /// Updates the client identifier stamped on future events and sessions.
    /// The open session, if any, is attributed to the new identifier too.
    pub fn set_client_ip(&mut self, ip: &str) -> Result<()> {
        let ip = ip.trim();
        let ip = if ip.is_empty() { self.fallback_ip.as_str() } else { ip };
        self.store.save_client_ip(ip)
    }

    pub fn start_session(&mut self) -> Result<OpenSession> {
        self.start_session_at(Utc::now())
    }

    /// Opens a session if none is open; returns the open session either way.
    pub fn start_session_at(&mut self, now: DateTime<Utc>) -> Result<OpenSession> {
        if let Some(current) = self.store.load_current_session()? {
            return Ok(current);
        }
        self.open_new_session(now)
    }

    pub fn reset_session(&mut self) -> Result<Option<Session>> {
        self.reset_session_at(Utc::now())
    }

    /// Closes the open session into the index and opens a fresh one.
    ///
    /// Returns the session that was closed, or `None` when there was no open
    /// session (in which case only the new session is opened). The index,
    /// the click log and the open-session keys are committed together.
    pub fn reset_session_at(&mut self, now: DateTime<Utc>) -> Result<Option<Session>> {
        let next = self.fresh_session(now)?;
        let mut update = StoreUpdate::new()
            .clicks(Vec::new())
            .current_session(Some(next.clone()));

        let closed = match self.store.load_current_session()? {
            Some(open) => {
                let click_count = self
                    .store
                    .load_clicks()?
                    .iter()
                    .filter(|click| click.session_id == open.session_id)
                    .count() as u64;
                let closed = open.close(now, click_count);

                let mut sessions = self.store.load_sessions()?;
                sessions.push(closed.clone());
                update = update.sessions(sessions);
                Some(closed)
            }
            None => None,
        };

        self.store.apply(update)?;

        if let Some(closed) = &closed {
            log_info!(
                "Closed session {} after {} with {} clicks",
                closed.session_id,
                format_duration(closed.duration_ms()),
                closed.click_count
            );
        }
        log_info!("Opened session {} for client {}", next.session_id, next.ip);
        Ok(closed)
    }

    /// Removes a closed session from the index along with any of its events
    /// still in the click log. Returns whether anything was removed.
    pub fn delete_session(&mut self, session_id: &str) -> Result<bool> {
        if let Some(current) = self.store.load_current_session()? {
            if current.session_id == session_id {
                return Err(AnalyticsError::SessionOpen(current.session_id));
            }
        }

        let mut update = StoreUpdate::new();

        let mut sessions = self.store.load_sessions()?;
        let sessions_before = sessions.len();
        sessions.retain(|session| session.session_id != session_id);
        if sessions.len() != sessions_before {
            update = update.sessions(sessions);
        }

        let mut clicks = self.store.load_clicks()?;
        let clicks_before = clicks.len();
        clicks.retain(|click| click.session_id != session_id);
        if clicks.len() != clicks_before {
            update = update.clicks(clicks);
        }

        if update.is_empty() {
            log_warn!("No session {session_id} to delete");
            return Ok(false);
        }

        self.store.apply(update)?;
        log_info!("Deleted session {session_id}");
        Ok(true)
    }

    fn open_new_session(&mut self, now: DateTime<Utc>) -> Result<OpenSession> {
        let session = self.fresh_session(now)?;
        self.store.apply(
            StoreUpdate::new()
                .clicks(Vec::new())
                .current_session(Some(session.clone())),
        )?;

        log_info!("Opened session {} for client {}", session.session_id, session.ip);
        Ok(session)
    }

    pub(crate) fn fresh_session(&self, now: DateTime<Utc>) -> Result<OpenSession> {
        Ok(OpenSession {
            session_id: Uuid::new_v4().to_string(),
            start_time: now,
            ip: self.client_ip()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::db::{keys, KeyValueBackend, KeyWrite, KeyedStore, MemoryBackend};
    use crate::session::SessionStatus;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn manager() -> SessionManager<KeyedStore<MemoryBackend>> {
        SessionManager::new(KeyedStore::new(MemoryBackend::new()))
    }

    fn click(session_id: &str, ms: i64) -> ClickEvent {
        ClickEvent {
            x: 1.0,
            y: 1.0,
            value: 1.0,
            timestamp: at(ms),
            session_id: session_id.into(),
            ip: "unknown".into(),
        }
    }

    /// Memory backend that refuses any write touching `failing_key`.
    #[derive(Default)]
    struct FailingBackend {
        inner: MemoryBackend,
        failing_key: Option<&'static str>,
    }

    impl FailingBackend {
        fn check(&self, key: &str) -> anyhow::Result<()> {
            if self.failing_key == Some(key) {
                anyhow::bail!("disk full");
            }
            Ok(())
        }
    }

    impl KeyValueBackend for FailingBackend {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> anyhow::Result<()> {
            self.check(key)?;
            self.inner.remove(key)
        }

        fn write_batch(&mut self, writes: &[KeyWrite<'_>]) -> anyhow::Result<()> {
            for (key, _) in writes {
                self.check(key)?;
            }
            self.inner.write_batch(writes)
        }
    }

    fn with_failing_key(
        manager: SessionManager<KeyedStore<FailingBackend>>,
        failing_key: Option<&'static str>,
    ) -> SessionManager<KeyedStore<FailingBackend>> {
        let mut backend = manager.into_store().into_inner();
        backend.failing_key = failing_key;
        SessionManager::new(KeyedStore::new(backend))
    }

    #[test]
    fn starts_in_no_session() {
        let manager = manager();
        assert_eq!(manager.state().unwrap(), SessionState::NoSession);
        assert_eq!(manager.state().unwrap().status(), SessionStatus::NoSession);
        assert_eq!(manager.client_ip().unwrap(), "unknown");
    }

    #[test]
    fn start_is_a_no_op_while_open() {
        let mut manager = manager();
        let first = manager.start_session_at(at(1_000)).unwrap();
        let second = manager.start_session_at(at(2_000)).unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.state().unwrap().status(), SessionStatus::Open);
    }

    #[test]
    fn reset_closes_exactly_one_session_and_opens_another() {
        let mut manager = manager();
        let t0 = at(1_000_000);
        let t1 = t0 + TimeDelta::milliseconds(90_500);

        let open = manager.start_session_at(t0).unwrap();
        manager.record_at(10.0, 20.0, 5.0, None, t0).unwrap();

        let closed = manager.reset_session_at(t1).unwrap().unwrap();
        assert_eq!(closed.session_id, open.session_id);
        assert_eq!(closed.start_time, t0);
        assert_eq!(closed.end_time, t1);
        assert_eq!(closed.duration_ms(), 90_500);
        assert_eq!(closed.click_count, 1);

        let sessions = manager.sessions().unwrap();
        assert_eq!(sessions, vec![closed]);

        let next = manager.current().unwrap().unwrap();
        assert_ne!(next.session_id, open.session_id);
        assert_eq!(next.start_time, t1);
        assert!(manager.clicks().unwrap().is_empty());
    }

    #[test]
    fn reset_without_open_session_only_opens_one() {
        let mut manager = manager();
        assert!(manager.reset_session_at(at(5)).unwrap().is_none());
        assert!(manager.sessions().unwrap().is_empty());
        assert!(manager.current().unwrap().is_some());
    }

    #[test]
    fn starting_clears_stale_clicks() {
        let mut manager = manager();
        manager.store.save_clicks(&[click("ghost", 1)]).unwrap();

        manager.start_session_at(at(2)).unwrap();
        assert!(manager.clicks().unwrap().is_empty());
    }

    #[test]
    fn sessions_carry_the_client_ip() {
        let mut manager = manager();
        manager.set_client_ip("203.0.113.9").unwrap();
        manager.start_session_at(at(0)).unwrap();
        let closed = manager.reset_session_at(at(10)).unwrap().unwrap();
        assert_eq!(closed.ip, "203.0.113.9");

        manager.set_client_ip("   ").unwrap();
        assert_eq!(manager.client_ip().unwrap(), "unknown");
    }

    #[test]
    fn delete_removes_closed_session() {
        let mut manager = manager();
        manager.start_session_at(at(0)).unwrap();
        let closed = manager.reset_session_at(at(10)).unwrap().unwrap();

        assert!(manager.delete_session(&closed.session_id).unwrap());
        assert!(manager.sessions().unwrap().is_empty());
        assert!(!manager.delete_session(&closed.session_id).unwrap());
    }

    #[test]
    fn delete_refuses_the_open_session() {
        let mut manager = manager();
        let open = manager.start_session_at(at(0)).unwrap();
        let err = manager.delete_session(&open.session_id).unwrap_err();
        assert!(matches!(err, AnalyticsError::SessionOpen(id) if id == open.session_id));
    }

    #[test]
    fn click_count_ignores_events_from_other_sessions() {
        let mut manager = manager();
        let open = manager.start_session_at(at(0)).unwrap();
        manager
            .store
            .save_clicks(&[click("ghost", 1), click(&open.session_id, 2), click("ghost", 3)])
            .unwrap();

        let closed = manager.reset_session_at(at(10)).unwrap().unwrap();
        assert_eq!(closed.click_count, 1);
    }

    #[test]
    fn failed_reset_keeps_the_session_open_and_the_index_unchanged() {
        let mut manager = SessionManager::new(KeyedStore::new(FailingBackend::default()));
        let open = manager.start_session_at(at(0)).unwrap();
        manager.record_at(5.0, 5.0, 1.0, None, at(1)).unwrap();

        let mut manager = with_failing_key(manager, Some(keys::CLICK_LOG));
        let err = manager.reset_session_at(at(10)).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(manager.sessions().unwrap().is_empty());
        assert_eq!(manager.current().unwrap().unwrap().session_id, open.session_id);
        assert_eq!(manager.clicks().unwrap().len(), 1);

        let mut manager = with_failing_key(manager, None);
        let closed = manager.reset_session_at(at(20)).unwrap().unwrap();
        assert_eq!(closed.session_id, open.session_id);
        assert_eq!(closed.click_count, 1);

        let ids: Vec<String> = manager
            .sessions()
            .unwrap()
            .into_iter()
            .map(|session| session.session_id)
            .collect();
        assert_eq!(ids, vec![open.session_id]);
    }

    #[test]
    fn failed_delete_keeps_index_and_log_in_step() {
        let mut manager = SessionManager::new(KeyedStore::new(FailingBackend::default()));
        manager.start_session_at(at(0)).unwrap();
        let closed = manager.reset_session_at(at(10)).unwrap().unwrap();
        manager.store.save_clicks(&[click(&closed.session_id, 5)]).unwrap();

        let mut manager = with_failing_key(manager, Some(keys::CLICK_LOG));
        assert!(manager.delete_session(&closed.session_id).is_err());
        assert_eq!(manager.sessions().unwrap().len(), 1);
        assert_eq!(manager.clicks().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_index_is_treated_as_empty_on_reset() {
        let mut backend = MemoryBackend::new();
        backend.set(keys::SESSION_INDEX, "[{\"broken\": true}]").unwrap();
        let mut manager = SessionManager::new(KeyedStore::new(backend));

        manager.start_session_at(at(0)).unwrap();
        manager.reset_session_at(at(1_000)).unwrap();
        assert_eq!(manager.sessions().unwrap().len(), 1);
    }
}
