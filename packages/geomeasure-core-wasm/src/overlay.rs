// Overlay geometry drawn on top of the map for the current measurement.
use geo::{BoundingRect, Centroid};
use geo_types::{Coord, LineString, MultiPoint, Point, Polygon, Rect};
use serde_json::{json, Value};

use crate::engine::MeasurementEngine;
use crate::geodesy::{circle_ring_with_radius, unwrap_longitudes, MIN_POLYGON_POINTS};
use crate::models::{GeoPoint, MeasurementMode, MeasurementResult};

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    /// Distance or path polyline.
    Line(LineString<f64>),
    /// Closed area polygon.
    Ring(Polygon<f64>),
    /// Radius circle, sampled into a polygon for renderers without circles.
    Circle {
        center: GeoPoint,
        radius_meters: f64,
        ring: Polygon<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementOverlay {
    pub mode: MeasurementMode,
    pub markers: Vec<GeoPoint>,
    pub shape: Option<OverlayShape>,
    pub summary: Option<String>,
}

impl MeasurementOverlay {
    pub fn from_engine(engine: &MeasurementEngine, circle_segments: usize) -> Self {
        let points = engine.points();
        let line = || LineString::new(drawn_coords(points));

        let shape = match (engine.active_mode(), engine.result()) {
            (MeasurementMode::Distance | MeasurementMode::Path, _) if points.len() >= 2 => {
                Some(OverlayShape::Line(line()))
            }
            (MeasurementMode::Area, _) if points.len() >= MIN_POLYGON_POINTS => {
                // Polygon::new closes the ring
                Some(OverlayShape::Ring(Polygon::new(line(), vec![])))
            }
            (MeasurementMode::Radius, Some(MeasurementResult::Radius { radius_km, .. })) => {
                let center = points[0];
                let ring = circle_ring_with_radius(
                    &center,
                    *radius_km,
                    circle_segments,
                    engine.earth_radius_km(),
                );
                Some(OverlayShape::Circle {
                    center,
                    radius_meters: radius_km * 1000.0,
                    ring: Polygon::new(ring, vec![]),
                })
            }
            _ => None,
        };

        Self {
            mode: engine.active_mode(),
            markers: points.to_vec(),
            shape,
            summary: engine.result().map(|r| r.to_string()),
        }
    }

    /// Where the result label goes: middle of the line, centroid of the area,
    /// center of the circle.
    pub fn label_anchor(&self) -> Option<Point<f64>> {
        match self.shape.as_ref()? {
            OverlayShape::Line(line) => line.centroid(),
            OverlayShape::Ring(polygon) => polygon.centroid(),
            OverlayShape::Circle { center, .. } => Some(Point::from(*center)),
        }
    }

    /// Bounding box of everything drawn, for fitting the map view. Longitudes
    /// are the drawn ones, so a shape across the antimeridian may reach past 180.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let mut coords: Vec<Point<f64>> =
            drawn_coords(&self.markers).into_iter().map(Point::from).collect();
        match &self.shape {
            Some(OverlayShape::Circle { ring, .. }) => {
                coords.extend(ring.exterior().points());
            }
            // Lines and rings only pass through the markers
            Some(OverlayShape::Line(_)) | Some(OverlayShape::Ring(_)) | None => {}
        }
        MultiPoint::new(coords).bounding_rect()
    }

    /// GeoJSON FeatureCollection with one Point feature per marker followed by
    /// the measurement shape. Coordinates are `[lng, lat]`.
    pub fn to_geojson(&self) -> Value {
        let mut features: Vec<Value> = drawn_coords(&self.markers)
            .into_iter()
            .enumerate()
            .map(|(index, c)| {
                json!({
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [c.x, c.y] },
                    "properties": { "role": "marker", "index": index }
                })
            })
            .collect();

        if let Some(shape) = &self.shape {
            let label = self.label_anchor().map(|p| vec![p.x(), p.y()]);
            let (geometry, extra) = match shape {
                OverlayShape::Line(line) => (
                    json!({ "type": "LineString", "coordinates": line_coords(line) }),
                    json!({}),
                ),
                OverlayShape::Ring(polygon) => (
                    json!({ "type": "Polygon", "coordinates": [line_coords(polygon.exterior())] }),
                    json!({}),
                ),
                OverlayShape::Circle {
                    center,
                    radius_meters,
                    ring,
                } => (
                    json!({ "type": "Polygon", "coordinates": [line_coords(ring.exterior())] }),
                    json!({
                        "center": [center.lng(), center.lat()],
                        "radius_meters": radius_meters
                    }),
                ),
            };

            let mut properties = json!({
                "role": "measurement",
                "mode": self.mode,
                "summary": self.summary,
                "label": label
            });
            if let (Some(props), Value::Object(extra)) = (properties.as_object_mut(), extra) {
                props.extend(extra);
            }

            features.push(json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": properties
            }));
        }

        let mut collection = json!({
            "type": "FeatureCollection",
            "features": features
        });
        if let Some(rect) = self.bounds() {
            collection["bbox"] = json!([rect.min().x, rect.min().y, rect.max().x, rect.max().y]);
        }
        collection
    }
}

// Marker coordinates as drawn: each longitude within 180 degrees of the
// previous one, starting from the first point (the center for a circle)
fn drawn_coords(points: &[GeoPoint]) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = points.iter().map(|p| Coord::from(*p)).collect();
    unwrap_longitudes(&mut coords);
    coords
}

fn line_coords(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}
