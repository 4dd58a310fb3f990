use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::ClickEvent;

const ALL: &str = "all";

/// Which part of the click log a view looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionSelection {
    #[default]
    All,
    Session(String),
}

impl SessionSelection {
    pub fn parse(value: &str) -> Self {
        if value == ALL {
            SessionSelection::All
        } else {
            SessionSelection::Session(value.to_string())
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionSelection::All => None,
            SessionSelection::Session(id) => Some(id),
        }
    }
}

impl From<&str> for SessionSelection {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for SessionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionSelection::All => f.write_str(ALL),
            SessionSelection::Session(id) => f.write_str(id),
        }
    }
}

impl Serialize for SessionSelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionSelection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// `All` yields the whole log, orphaned events included; a session id yields
/// exactly that session's events in log order.
pub fn filter_clicks_by_session(
    clicks: &[ClickEvent],
    selection: &SessionSelection,
) -> Vec<ClickEvent> {
    match selection {
        SessionSelection::All => clicks.to_vec(),
        SessionSelection::Session(id) => clicks
            .iter()
            .filter(|click| &click.session_id == id)
            .cloned()
            .collect(),
    }
}
