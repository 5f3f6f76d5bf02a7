// This is the models module containing shared data structures
use std::fmt;
use std::str::FromStr;

use geo_types::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, MeasureResult};

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

// Unvalidated wire form, checked by `TryFrom` during deserialization
#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = MeasureError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lng)
    }
}

impl GeoPoint {
    /// Creates a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> MeasureResult<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(MeasureError::invalid_point(lat, lng, "coordinates must be finite"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(MeasureError::invalid_point(
                lat,
                lng,
                "latitude must be within [-90, 90]",
            ));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(MeasureError::invalid_point(
                lat,
                lng,
                "longitude must be within [-180, 180]",
            ));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl From<GeoPoint> for Coord<f64> {
    fn from(p: GeoPoint) -> Self {
        Coord { x: p.lng, y: p.lat }
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.lng, p.lat)
    }
}

/// Which measurement the map tool is currently taking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementMode {
    #[default]
    None,
    Distance,
    Area,
    Radius,
    Path,
}

impl MeasurementMode {
    /// Maximum number of points this mode accepts; `None` means unbounded.
    pub fn capacity(self) -> Option<usize> {
        match self {
            MeasurementMode::None => Some(0),
            MeasurementMode::Distance | MeasurementMode::Radius => Some(2),
            MeasurementMode::Area | MeasurementMode::Path => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementMode::None => "none",
            MeasurementMode::Distance => "distance",
            MeasurementMode::Area => "area",
            MeasurementMode::Radius => "radius",
            MeasurementMode::Path => "path",
        }
    }
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementMode {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(MeasurementMode::None),
            "distance" => Ok(MeasurementMode::Distance),
            "area" => Ok(MeasurementMode::Area),
            "radius" => Ok(MeasurementMode::Radius),
            "path" => Ok(MeasurementMode::Path),
            other => Err(MeasureError::UnknownMode(other.to_string())),
        }
    }
}

/// Derived quantities for the active mode, recomputed from the full point list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum MeasurementResult {
    Distance { distance_km: f64 },
    Area { area_km2: f64 },
    Radius { radius_km: f64, circle_area_km2: f64 },
    Path { path_distance_km: f64 },
}

impl MeasurementResult {
    pub fn mode(&self) -> MeasurementMode {
        match self {
            MeasurementResult::Distance { .. } => MeasurementMode::Distance,
            MeasurementResult::Area { .. } => MeasurementMode::Area,
            MeasurementResult::Radius { .. } => MeasurementMode::Radius,
            MeasurementResult::Path { .. } => MeasurementMode::Path,
        }
    }
}

// Text shown in the result panel
impl fmt::Display for MeasurementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementResult::Distance { distance_km } => write!(f, "{distance_km:.2} km"),
            MeasurementResult::Area { area_km2 } => write!(f, "{area_km2:.2} km²"),
            MeasurementResult::Radius {
                radius_km,
                circle_area_km2,
            } => write!(f, "radius {radius_km:.2} km, area {circle_area_km2:.2} km²"),
            MeasurementResult::Path { path_distance_km } => write!(f, "{path_distance_km:.2} km"),
        }
    }
}

/// Read-only view of an engine handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    pub mode: MeasurementMode,
    pub points: Vec<GeoPoint>,
    pub result: Option<MeasurementResult>,
    pub radius_meters: Option<f64>,
    pub panel_visible: bool,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub total_lookups: usize,
    pub hit_rate: f64,
}
