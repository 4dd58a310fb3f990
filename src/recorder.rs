//! Click capture for the open session.

use chrono::{DateTime, Utc};

use crate::{
    db::{AnalyticsStore, StoreUpdate},
    error::{AnalyticsError, Result},
    models::{validate_point, ClickEvent},
    session::{MissingSessionPolicy, SessionManager},
};
use crate::log_info;

const ENABLE_LOGS: bool = true;

impl<S: AnalyticsStore> SessionManager<S> {
    pub fn record(
        &mut self,
        x: f64,
        y: f64,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<ClickEvent> {
        self.record_at(x, y, value, timestamp, Utc::now())
    }

    /// Appends one click to the log, stamped with the open session and client.
    ///
    /// `timestamp` defaults to `now`. With no open session the manager's
    /// `MissingSessionPolicy` applies. Invalid input is rejected before any
    /// session is opened.
    pub fn record_at(
        &mut self,
        x: f64,
        y: f64,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<ClickEvent> {
        validate_point(x, y, value).map_err(AnalyticsError::InvalidClick)?;

        let (session, opened) = match self.store.load_current_session()? {
            Some(session) => (session, false),
            None => match self.policy {
                MissingSessionPolicy::AutoStart => {
                    log_info!("No open session; starting one for incoming click");
                    (self.fresh_session(now)?, true)
                }
                MissingSessionPolicy::Reject => return Err(AnalyticsError::UninitializedSession),
            },
        };

        let click = ClickEvent {
            x,
            y,
            value,
            timestamp: timestamp.unwrap_or(now),
            session_id: session.session_id.clone(),
            ip: session.ip.clone(),
        };

        if opened {
            // The new session starts with a log holding only this click
            self.store.apply(
                StoreUpdate::new()
                    .clicks(vec![click.clone()])
                    .current_session(Some(session)),
            )?;
        } else {
            let mut clicks = self.store.load_clicks()?;
            clicks.push(click.clone());
            self.store.save_clicks(&clicks)?;
        }

        Ok(click)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{KeyedStore, MemoryBackend};

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn auto_starts_a_session_by_default() {
        let mut manager = SessionManager::new(KeyedStore::new(MemoryBackend::new()));
        let click = manager.record_at(3.0, 4.0, 120.0, None, at(500)).unwrap();

        let open = manager.current().unwrap().unwrap();
        assert_eq!(click.session_id, open.session_id);
        assert_eq!(click.timestamp, at(500));
        assert_eq!(open.start_time, at(500));
        assert_eq!(manager.clicks().unwrap(), vec![click]);
    }

    #[test]
    fn reject_policy_signals_uninitialized_session() {
        let mut manager = SessionManager::new(KeyedStore::new(MemoryBackend::new()))
            .with_policy(MissingSessionPolicy::Reject);

        let err = manager.record_at(1.0, 1.0, 1.0, None, at(0)).unwrap_err();
        assert!(matches!(err, AnalyticsError::UninitializedSession));
        assert!(manager.current().unwrap().is_none());
        assert!(manager.clicks().unwrap().is_empty());

        manager.start_session_at(at(1)).unwrap();
        assert!(manager.record_at(1.0, 1.0, 1.0, None, at(2)).is_ok());
    }

    #[test]
    fn explicit_timestamp_wins_over_now() {
        let mut manager = SessionManager::new(KeyedStore::new(MemoryBackend::new()));
        manager.start_session_at(at(0)).unwrap();
        let click = manager
            .record_at(0.0, 0.0, 1.0, Some(at(42)), at(9_000))
            .unwrap();
        assert_eq!(click.timestamp, at(42));
    }

    #[test]
    fn invalid_click_does_not_open_a_session() {
        let mut manager = SessionManager::new(KeyedStore::new(MemoryBackend::new()));
        let err = manager.record_at(f64::NAN, 0.0, 1.0, None, at(0)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidClick(_)));
        assert!(manager.current().unwrap().is_none());
    }

    #[test]
    fn events_append_in_order() {
        let mut manager = SessionManager::new(KeyedStore::new(MemoryBackend::new()));
        manager.start_session_at(at(0)).unwrap();
        for i in 0..3 {
            manager
                .record_at(i as f64, 0.0, 1.0, None, at(10 + i))
                .unwrap();
        }
        let xs: Vec<f64> = manager.clicks().unwrap().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }
}
