use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, MeasureResult};
use crate::geodesy::EARTH_RADIUS_KM;

pub const DEFAULT_CIRCLE_SEGMENTS: usize = 64;
pub const DEFAULT_MAX_SESSIONS: usize = 32;

// Bounds on the number of vertices used to draw a radius circle
const MIN_CIRCLE_SEGMENTS: usize = 8;
const MAX_CIRCLE_SEGMENTS: usize = 720;

/// Settings for measurement sessions, passed from JS as a plain object.
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub earth_radius_km: f64,
    pub circle_segments: usize,
    pub max_sessions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: EARTH_RADIUS_KM,
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> MeasureResult<()> {
        if !self.earth_radius_km.is_finite() || self.earth_radius_km <= 0.0 {
            return Err(MeasureError::invalid_config(format!(
                "earth_radius_km must be a positive number, got {}",
                self.earth_radius_km
            )));
        }
        if !(MIN_CIRCLE_SEGMENTS..=MAX_CIRCLE_SEGMENTS).contains(&self.circle_segments) {
            return Err(MeasureError::invalid_config(format!(
                "circle_segments must be within {}..={}, got {}",
                MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS, self.circle_segments
            )));
        }
        if self.max_sessions == 0 {
            return Err(MeasureError::invalid_config("max_sessions must be at least 1"));
        }
        Ok(())
    }
}
