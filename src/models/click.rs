use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded interaction, positioned in the captured page's coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub x: f64,
    pub y: f64,
    /// Weight of the interaction; drives heat intensity.
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub ip: String,
}

impl ClickEvent {
    /// Checks the numeric fields a heatmap can actually render.
    pub fn validate(&self) -> Result<(), String> {
        validate_point(self.x, self.y, self.value)
    }
}

pub fn validate_point(x: f64, y: f64, value: f64) -> Result<(), String> {
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("position ({x}, {y}) is not finite"));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(format!("value {value} must be finite and non-negative"));
    }
    Ok(())
}
