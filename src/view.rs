//! The snapshot a display surface renders for one session selection.

use serde::Serialize;

use crate::{
    aggregation::{
        filter_clicks_by_session, find_session, format_duration, format_timestamp,
        group_sessions_by_client, summarize, ClickSummary, HeatmapPayload, SessionSelection,
    },
    db::AnalyticsStore,
    error::Result,
    models::{ClickEvent, Session, SessionGroup, SessionInfo},
    session::SessionManager,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOption {
    pub session_id: String,
    pub label: String,
    pub duration_label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGroupView {
    pub ip: String,
    pub label: String,
    pub sessions: Vec<SessionOption>,
}

impl ClientGroupView {
    /// `position` is the zero-based index of the group in the picker.
    fn from_group(position: usize, group: &SessionGroup) -> Self {
        Self {
            ip: group.ip.clone(),
            label: format!("Client {} (IP: {})", position + 1, group.ip),
            sessions: group
                .sessions
                .iter()
                .enumerate()
                .map(|(index, session)| session_option(index, session))
                .collect(),
        }
    }
}

fn session_option(index: usize, session: &Session) -> SessionOption {
    let duration_label = format_duration(session.duration_ms());
    SessionOption {
        session_id: session.session_id.clone(),
        label: format!(
            "Session {} - {} ({})",
            index + 1,
            format_timestamp(session.start_time),
            duration_label
        ),
        duration_label,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub selection: SessionSelection,
    pub groups: Vec<ClientGroupView>,
    pub summary: ClickSummary,
    pub time_range_label: String,
    /// Details of the selected closed session; `None` for `All` or an id
    /// missing from the index.
    pub selected_session: Option<SessionInfo>,
    pub heatmap: HeatmapPayload,
}

impl AnalyticsView {
    pub fn build(
        sessions: &[Session],
        clicks: &[ClickEvent],
        selection: &SessionSelection,
    ) -> Self {
        let filtered = filter_clicks_by_session(clicks, selection);
        let summary = summarize(&filtered);

        let time_range_label = match summary.time_range {
            Some(range) => format!(
                "{} - {}",
                format_timestamp(range.earliest),
                format_timestamp(range.latest)
            ),
            None => "No data".to_string(),
        };

        let selected_session = selection
            .session_id()
            .and_then(|id| find_session(sessions, id))
            .map(SessionInfo::from);

        Self {
            selection: selection.clone(),
            groups: group_sessions_by_client(sessions)
                .iter()
                .enumerate()
                .map(|(position, group)| ClientGroupView::from_group(position, group))
                .collect(),
            summary,
            time_range_label,
            selected_session,
            heatmap: HeatmapPayload::from_clicks(&filtered),
        }
    }
}

impl<S: AnalyticsStore> SessionManager<S> {
    pub fn view(&self, selection: &SessionSelection) -> Result<AnalyticsView> {
        let sessions = self.sessions()?;
        let clicks = self.clicks()?;
        Ok(AnalyticsView::build(&sessions, &clicks, selection))
    }
}
