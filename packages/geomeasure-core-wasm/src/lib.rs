use log::{info, LevelFilter};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

// Browser console bindings and the log forwarder
pub mod console;
pub mod config;
pub mod engine;
pub mod error;
// Spherical distance, area and circle calculations
pub mod geodesy;
pub mod models;
mod module_state;
// GeoJSON overlay for the map
pub mod overlay;

pub use config::EngineConfig;
pub use engine::{MeasurementEngine, PointDisposition};
pub use error::{MeasureError, MeasureResult};
pub use models::{GeoPoint, MeasurementMode, MeasurementResult, MeasurementSnapshot, SessionStats};
pub use overlay::{MeasurementOverlay, OverlayShape};

use module_state::ModuleState;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console::init_logger(LevelFilter::Info);

        info!("measurement module initialized");
    });
}

/// Change the console log level ("off", "error", "warn", "info", "debug", "trace").
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter: LevelFilter = level
        .parse()
        .map_err(|_| MeasureError::invalid_config(format!("unknown log level: {}", level)))?;
    log::set_max_level(filter);
    Ok(())
}

/// Apply settings from a JS object; missing fields keep their defaults.
#[wasm_bindgen]
pub fn configure_measurement(config: JsValue) -> Result<(), JsValue> {
    let config: EngineConfig = if config.is_undefined() || config.is_null() {
        EngineConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    ModuleState::with_mut(|state| state.apply_config(config))?;
    Ok(())
}

#[wasm_bindgen]
pub fn open_measurement_session(session_id: &str) {
    ModuleState::with_mut(|state| state.open_session(session_id));
}

#[wasm_bindgen]
pub fn close_measurement_session(session_id: &str) -> bool {
    ModuleState::with_mut(|state| state.close_session(session_id))
}

#[wasm_bindgen]
pub fn has_measurement_session(session_id: &str) -> bool {
    ModuleState::with(|state| state.has_session(session_id))
}

#[wasm_bindgen]
pub fn list_measurement_sessions() -> Result<JsValue, JsValue> {
    let ids = ModuleState::with(|state| state.session_ids());
    Ok(to_value(&ids)?)
}

/// Drop every session, e.g. when the map page unmounts.
#[wasm_bindgen]
pub fn clear_measurement_sessions() {
    ModuleState::with_mut(|state| state.clear_sessions());
}

/// Select (or toggle off) a mode: "none", "distance", "area", "radius", "path".
#[wasm_bindgen]
pub fn select_measurement_mode(session_id: &str, mode: &str) -> Result<JsValue, JsValue> {
    let mode: MeasurementMode = mode.parse()?;
    let snapshot = ModuleState::with_mut(|state| {
        state.with_session_mut(session_id, |engine| {
            engine.select_mode(mode);
            engine.snapshot()
        })
    })?;
    Ok(to_value(&snapshot)?)
}

/// Submit a map click. Out-of-range coordinates are rejected with an error and
/// leave the session unchanged.
#[wasm_bindgen]
pub fn submit_measurement_point(session_id: &str, lat: f64, lng: f64) -> Result<JsValue, JsValue> {
    let snapshot = ModuleState::with_mut(|state| {
        state.with_session_mut(session_id, |engine| {
            engine
                .submit_coordinates(lat, lng)
                .map(|_| engine.snapshot())
        })
    })??;
    Ok(to_value(&snapshot)?)
}

#[wasm_bindgen]
pub fn reset_measurement(session_id: &str) -> Result<JsValue, JsValue> {
    let snapshot = ModuleState::with_mut(|state| {
        state.with_session_mut(session_id, |engine| {
            engine.reset();
            engine.snapshot()
        })
    })?;
    Ok(to_value(&snapshot)?)
}

#[wasm_bindgen]
pub fn get_measurement_state(session_id: &str) -> Result<JsValue, JsValue> {
    let snapshot =
        ModuleState::with_mut(|state| state.with_session(session_id, |engine| engine.snapshot()))?;
    Ok(to_value(&snapshot)?)
}

/// GeoJSON FeatureCollection of markers and the measurement shape.
#[wasm_bindgen]
pub fn get_measurement_overlay(session_id: &str) -> Result<String, JsValue> {
    let geojson = ModuleState::with_mut(|state| {
        let segments = state.config.circle_segments;
        state.with_session(session_id, |engine| {
            MeasurementOverlay::from_engine(engine, segments).to_geojson()
        })
    })?;
    serde_json::to_string(&geojson)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize overlay: {}", e)))
}

#[wasm_bindgen]
pub fn get_session_stats() -> Result<JsValue, JsValue> {
    let stats = ModuleState::with(|state| state.stats());
    Ok(to_value(&stats)?)
}

/// Great-circle distance in kilometers between two points.
#[wasm_bindgen]
pub fn great_circle_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64, JsValue> {
    let a = GeoPoint::new(lat1, lng1)?;
    let b = GeoPoint::new(lat2, lng2)?;
    Ok(geodesy::distance_km(&a, &b))
}

/// Polygon area in km² from a flat `[lng, lat, ...]` array of at least three points.
#[wasm_bindgen]
pub fn polygon_area_km2_direct(coordinates: &[f64]) -> Result<f64, JsValue> {
    let points = geodesy::points_from_flat(coordinates)?;
    Ok(geodesy::polygon_area_km2(&points)?)
}

/// Path length in km from a flat `[lng, lat, ...]` array.
#[wasm_bindgen]
pub fn path_distance_km_direct(coordinates: &[f64]) -> Result<f64, JsValue> {
    let points = geodesy::points_from_flat(coordinates)?;
    Ok(geodesy::path_distance_km(&points))
}
