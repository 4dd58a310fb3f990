use serde::{Deserialize, Serialize};

use crate::models::ClickEvent;

/// Intensity assigned to the heaviest point of a normalized set.
pub const HEATMAP_MAX: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: i64,
    pub y: i64,
    pub value: i64,
}

/// Data handed to the overlay renderer: points already on a 0..=`max` scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapPayload {
    pub max: i64,
    pub data: Vec<HeatmapPoint>,
}

impl HeatmapPayload {
    pub fn from_clicks(clicks: &[ClickEvent]) -> Self {
        Self {
            max: HEATMAP_MAX,
            data: normalize_for_heatmap(clicks),
        }
    }
}

/// Rescales click weights linearly so the heaviest click maps to 100.
///
/// Positions are rounded to whole pixels. Blurring happens in the renderer,
/// not here. A set whose heaviest weight is zero maps every point to zero.
pub fn normalize_for_heatmap(clicks: &[ClickEvent]) -> Vec<HeatmapPoint> {
    let Some(max_value) = clicks.iter().map(|click| click.value).reduce(f64::max) else {
        return Vec::new();
    };

    clicks
        .iter()
        .map(|click| HeatmapPoint {
            x: round_half_up(click.x),
            y: round_half_up(click.y),
            value: if max_value > 0.0 {
                round_half_up(click.value / max_value * HEATMAP_MAX as f64)
            } else {
                0
            },
        })
        .collect()
}

/// Halves round toward positive infinity (-2.5 -> -2, 2.5 -> 3), the rounding
/// the overlay renderer applies to its own coordinates.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
