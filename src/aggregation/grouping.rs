use std::collections::HashMap;

use crate::models::{Session, SessionGroup};

/// Partitions sessions by client identifier.
///
/// Groups appear in order of each ip's first occurrence in `sessions`; within
/// a group sessions run most recent first, equal start times keeping their
/// input order.
pub fn group_sessions_by_client(sessions: &[Session]) -> Vec<SessionGroup> {
    let mut groups: Vec<SessionGroup> = Vec::new();
    let mut index_by_ip: HashMap<&str, usize> = HashMap::new();

    for session in sessions {
        let index = *index_by_ip.entry(session.ip.as_str()).or_insert_with(|| {
            groups.push(SessionGroup {
                ip: session.ip.clone(),
                sessions: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].sessions.push(session.clone());
    }

    for group in &mut groups {
        // sort_by is stable, which keeps ties in input order
        group
            .sessions
            .sort_by(|a, b| b.start_time.cmp(&a.start_time));
    }

    groups
}

pub fn find_session<'a>(sessions: &'a [Session], session_id: &str) -> Option<&'a Session> {
    sessions
        .iter()
        .find(|session| session.session_id == session_id)
}
