// Measurement state machine behind the map page's measure tool.
//
// One engine per measurement session. Every mutation goes through
// `select_mode`, `submit_point` or `reset`. Validation and capacity checks
// run before anything changes, and the result is recomputed from the stored
// points before the call returns.

use log::{debug, warn};

use crate::error::MeasureResult;
use crate::geodesy::{
    circle_area_km2, distance_km_with_radius, path_distance_km_with_radius,
    polygon_area_km2_with_radius, EARTH_RADIUS_KM, MIN_POLYGON_POINTS,
};
use crate::models::{GeoPoint, MeasurementMode, MeasurementResult, MeasurementSnapshot};

/// What happened to a submitted point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointDisposition {
    Accepted,
    /// No mode is active, the point was ignored.
    Inactive,
    /// The mode already holds its maximum number of points.
    AtCapacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementEngine {
    mode: MeasurementMode,
    points: Vec<GeoPoint>,
    result: Option<MeasurementResult>,
    panel_visible: bool,
    earth_radius_km: f64,
}

impl Default for MeasurementEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementEngine {
    pub fn new() -> Self {
        Self::with_earth_radius(EARTH_RADIUS_KM)
    }

    pub fn with_earth_radius(earth_radius_km: f64) -> Self {
        Self {
            mode: MeasurementMode::None,
            points: Vec::new(),
            result: None,
            panel_visible: false,
            earth_radius_km,
        }
    }

    /// Activates `new_mode`, or turns measuring off when it is already active.
    /// Either way the in-progress measurement is discarded.
    pub fn select_mode(&mut self, new_mode: MeasurementMode) {
        let next = if new_mode == self.mode {
            MeasurementMode::None
        } else {
            new_mode
        };
        debug!("measurement mode {} -> {}", self.mode, next);
        self.mode = next;
        self.reset();
    }

    /// Adds a map click to the current measurement.
    pub fn submit_point(&mut self, point: GeoPoint) -> PointDisposition {
        if self.mode == MeasurementMode::None {
            return PointDisposition::Inactive;
        }
        if let Some(cap) = self.mode.capacity() {
            if self.points.len() >= cap {
                debug!(
                    "{} measurement already holds {} points, ignoring ({}, {})",
                    self.mode,
                    cap,
                    point.lat(),
                    point.lng()
                );
                return PointDisposition::AtCapacity;
            }
        }

        self.points.push(point);
        self.result = self.compute(&self.points);
        self.panel_visible = true;

        if let Some(result) = &self.result {
            debug!("{} measurement with {} points: {}", self.mode, self.points.len(), result);
        }
        PointDisposition::Accepted
    }

    /// Validates raw coordinates and submits them. An invalid point leaves the
    /// engine untouched.
    pub fn submit_coordinates(&mut self, lat: f64, lng: f64) -> MeasureResult<PointDisposition> {
        let point = GeoPoint::new(lat, lng).map_err(|err| {
            warn!("rejected measurement point: {}", err);
            err
        })?;
        Ok(self.submit_point(point))
    }

    /// Clears points and results and hides the result panel. The mode stays.
    pub fn reset(&mut self) {
        self.points.clear();
        self.result = None;
        self.panel_visible = false;
    }

    pub fn active_mode(&self) -> MeasurementMode {
        self.mode
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn result(&self) -> Option<&MeasurementResult> {
        self.result.as_ref()
    }

    pub fn is_panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn earth_radius_km(&self) -> f64 {
        self.earth_radius_km
    }

    /// Radius of the overlay circle in meters, only in radius mode once the
    /// edge point is set.
    pub fn radius_meters(&self) -> Option<f64> {
        match self.result {
            Some(MeasurementResult::Radius { radius_km, .. }) => Some(radius_km * 1000.0),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> MeasurementSnapshot {
        MeasurementSnapshot {
            mode: self.mode,
            points: self.points.clone(),
            result: self.result,
            radius_meters: self.radius_meters(),
            panel_visible: self.panel_visible,
            summary: self.result.map(|r| r.to_string()),
        }
    }

    // Result for the given point list, or None when the mode needs more points
    fn compute(&self, points: &[GeoPoint]) -> Option<MeasurementResult> {
        let r = self.earth_radius_km;
        match self.mode {
            MeasurementMode::None => None,
            MeasurementMode::Distance => match points {
                [a, b] => Some(MeasurementResult::Distance {
                    distance_km: distance_km_with_radius(a, b, r),
                }),
                _ => None,
            },
            MeasurementMode::Area => {
                if points.len() < MIN_POLYGON_POINTS {
                    return None;
                }
                polygon_area_km2_with_radius(points, r)
                    .ok()
                    .map(|area_km2| MeasurementResult::Area { area_km2 })
            }
            MeasurementMode::Radius => match points {
                [center, edge] => {
                    let radius_km = distance_km_with_radius(center, edge, r);
                    Some(MeasurementResult::Radius {
                        radius_km,
                        circle_area_km2: circle_area_km2(radius_km),
                    })
                }
                _ => None,
            },
            MeasurementMode::Path => {
                if points.len() < 2 {
                    return None;
                }
                Some(MeasurementResult::Path {
                    path_distance_km: path_distance_km_with_radius(points, r),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeasureError;

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn engine_in(mode: MeasurementMode) -> MeasurementEngine {
        let mut engine = MeasurementEngine::new();
        engine.select_mode(mode);
        engine
    }

    #[test]
    fn starts_idle_and_ignores_points() {
        let mut engine = MeasurementEngine::new();
        assert_eq!(engine.active_mode(), MeasurementMode::None);
        assert_eq!(engine.submit_point(pt(1.0, 1.0)), PointDisposition::Inactive);
        assert!(engine.points().is_empty());
        assert!(engine.result().is_none());
        assert!(!engine.is_panel_visible());
    }

    #[test]
    fn selecting_same_mode_toggles_off() {
        let mut engine = engine_in(MeasurementMode::Path);
        engine.submit_point(pt(0.0, 0.0));
        engine.submit_point(pt(0.0, 1.0));

        engine.select_mode(MeasurementMode::Path);
        assert_eq!(engine.active_mode(), MeasurementMode::None);
        assert!(engine.points().is_empty());
        assert!(engine.result().is_none());
        assert!(!engine.is_panel_visible());
    }

    #[test]
    fn switching_mode_discards_measurement() {
        let mut engine = engine_in(MeasurementMode::Distance);
        engine.submit_point(pt(0.0, 0.0));
        engine.submit_point(pt(0.0, 1.0));
        assert!(engine.result().is_some());

        engine.select_mode(MeasurementMode::Area);
        assert_eq!(engine.active_mode(), MeasurementMode::Area);
        assert!(engine.points().is_empty());
        assert!(engine.result().is_none());
    }

    #[test]
    fn distance_new_york_to_london() {
        let mut engine = engine_in(MeasurementMode::Distance);
        engine.submit_point(pt(40.7128, -74.0060));
        assert!(engine.is_panel_visible());
        assert!(engine.result().is_none());

        engine.submit_point(pt(51.5074, -0.1278));
        match engine.result() {
            Some(MeasurementResult::Distance { distance_km }) => {
                assert!((distance_km - 5570.0).abs() < 20.0, "got {distance_km}")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn distance_ignores_third_point() {
        let mut engine = engine_in(MeasurementMode::Distance);
        engine.submit_point(pt(0.0, 0.0));
        engine.submit_point(pt(0.0, 1.0));
        let before = *engine.result().unwrap();

        assert_eq!(engine.submit_point(pt(5.0, 5.0)), PointDisposition::AtCapacity);
        assert_eq!(engine.points().len(), 2);
        assert_eq!(engine.result(), Some(&before));
    }

    #[test]
    fn area_needs_three_points() {
        let mut engine = engine_in(MeasurementMode::Area);
        engine.submit_point(pt(0.0, 0.0));
        engine.submit_point(pt(0.0, 1.0));
        assert!(engine.result().is_none());

        engine.submit_point(pt(1.0, 0.0));
        match engine.result() {
            Some(MeasurementResult::Area { area_km2 }) => {
                assert!(area_km2.is_finite() && *area_km2 > 0.0)
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn area_recomputes_on_every_point() {
        let mut engine = engine_in(MeasurementMode::Area);
        for p in [pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0)] {
            engine.submit_point(p);
        }
        let triangle = match engine.result() {
            Some(MeasurementResult::Area { area_km2 }) => *area_km2,
            other => panic!("unexpected result {other:?}"),
        };

        engine.submit_point(pt(1.0, 0.0));
        let square = match engine.result() {
            Some(MeasurementResult::Area { area_km2 }) => *area_km2,
            other => panic!("unexpected result {other:?}"),
        };
        assert_eq!(engine.points().len(), 4);
        assert!((square - 2.0 * triangle).abs() / square < 0.01);
    }

    #[test]
    fn radius_from_center_and_edge() {
        let mut engine = engine_in(MeasurementMode::Radius);
        engine.submit_point(pt(0.0, 0.0));
        assert!(engine.result().is_none());
        assert!(engine.radius_meters().is_none());

        engine.submit_point(pt(0.0, 1.0));
        match engine.result() {
            Some(MeasurementResult::Radius {
                radius_km,
                circle_area_km2,
            }) => {
                assert!((radius_km - 111.19).abs() < 0.01);
                assert!((circle_area_km2 - 38_845.0).abs() < 10.0);
            }
            other => panic!("unexpected result {other:?}"),
        }
        let meters = engine.radius_meters().unwrap();
        assert!((meters - 111_195.0).abs() < 1.0, "got {meters}");

        assert_eq!(engine.submit_point(pt(3.0, 3.0)), PointDisposition::AtCapacity);
        assert_eq!(engine.points().len(), 2);
    }

    #[test]
    fn path_sums_hops() {
        let mut engine = engine_in(MeasurementMode::Path);
        engine.submit_point(pt(0.0, 0.0));
        assert!(engine.result().is_none());
        engine.submit_point(pt(0.0, 1.0));
        engine.submit_point(pt(0.0, 2.0));

        match engine.result() {
            Some(MeasurementResult::Path { path_distance_km }) => {
                assert!((path_distance_km - 222.38).abs() < 0.02)
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn reset_is_idempotent_and_keeps_mode() {
        let mut engine = engine_in(MeasurementMode::Area);
        for p in [pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 0.0)] {
            engine.submit_point(p);
        }

        engine.reset();
        let once = engine.clone();
        engine.reset();
        assert_eq!(engine, once);
        assert_eq!(engine.active_mode(), MeasurementMode::Area);
        assert!(engine.points().is_empty());
        assert!(engine.result().is_none());
        assert!(!engine.is_panel_visible());
    }

    #[test]
    fn invalid_coordinates_leave_state_unchanged() {
        let mut engine = engine_in(MeasurementMode::Path);
        engine.submit_point(pt(10.0, 10.0));
        let before = engine.clone();

        let err = engine.submit_coordinates(120.0, 10.0).unwrap_err();
        assert!(matches!(err, MeasureError::InvalidPoint { .. }));
        assert!(engine.submit_coordinates(f64::NAN, 0.0).is_err());
        assert_eq!(engine, before);

        assert_eq!(
            engine.submit_coordinates(11.0, 11.0).unwrap(),
            PointDisposition::Accepted
        );
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut engine = engine_in(MeasurementMode::Radius);
        engine.submit_point(pt(0.0, 0.0));
        engine.submit_point(pt(0.0, 1.0));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.mode, MeasurementMode::Radius);
        assert_eq!(snapshot.points.len(), 2);
        assert!(snapshot.panel_visible);
        assert_eq!(snapshot.radius_meters, engine.radius_meters());
        assert!(snapshot.summary.unwrap().starts_with("radius 111.19 km"));
    }

    #[test]
    fn custom_earth_radius_scales_results() {
        let mut engine = MeasurementEngine::with_earth_radius(2.0 * EARTH_RADIUS_KM);
        engine.select_mode(MeasurementMode::Distance);
        engine.submit_point(pt(0.0, 0.0));
        engine.submit_point(pt(0.0, 1.0));
        match engine.result() {
            Some(MeasurementResult::Distance { distance_km }) => {
                assert!((distance_km - 222.39).abs() < 0.02)
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn long_path_matches_direct_path_length() {
        let points: Vec<GeoPoint> = (0..2000)
            .map(|i| pt((i % 7) as f64 * 0.01, i as f64 * 0.05 - 50.0))
            .collect();
        let mut engine = engine_in(MeasurementMode::Path);
        for p in &points {
            assert_eq!(engine.submit_point(*p), PointDisposition::Accepted);
        }

        assert_eq!(engine.points(), points.as_slice());
        match engine.result() {
            Some(MeasurementResult::Path { path_distance_km }) => {
                let expected = crate::geodesy::path_distance_km(&points);
                assert!((path_distance_km - expected).abs() < 1e-6);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
