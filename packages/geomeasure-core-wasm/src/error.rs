//! Error types for measurement operations.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Result type alias for measurement operations.
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Errors that can occur while measuring on the map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    /// Coordinate is non-finite or outside the latitude/longitude range.
    #[error("invalid point ({lat}, {lng}): {reason}")]
    InvalidPoint {
        /// Latitude as supplied.
        lat: f64,
        /// Longitude as supplied.
        lng: f64,
        /// Which constraint was violated.
        reason: String,
    },

    /// Not enough points for the requested calculation.
    #[error("insufficient points: need at least {required}, got {actual}")]
    InsufficientPoints {
        /// Minimum number of points.
        required: usize,
        /// Number of points supplied.
        actual: usize,
    },

    /// Mode name not recognised.
    #[error("unknown measurement mode: {0}")]
    UnknownMode(String),

    /// No session registered under this id.
    #[error("unknown measurement session: {0}")]
    UnknownSession(String),

    /// Configuration value rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Flat coordinate array could not be read as `[lng, lat]` pairs.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

impl MeasureError {
    /// Create an invalid point error.
    #[must_use]
    pub fn invalid_point(lat: f64, lng: f64, reason: impl Into<String>) -> Self {
        Self::InvalidPoint {
            lat,
            lng,
            reason: reason.into(),
        }
    }

    /// Create an insufficient points error.
    #[must_use]
    pub const fn insufficient_points(required: usize, actual: usize) -> Self {
        Self::InsufficientPoints { required, actual }
    }

    /// Create an invalid config error.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }
}

// JS callers get a proper `Error` with the display message
impl From<MeasureError> for JsValue {
    fn from(err: MeasureError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
