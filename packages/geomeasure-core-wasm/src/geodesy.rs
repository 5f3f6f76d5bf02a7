// Spherical-earth measurements on latitude/longitude points.
//
// All functions treat the earth as a sphere. The `*_with_radius` variants take
// the sphere radius in kilometers; the plain variants use EARTH_RADIUS_KM.

use std::f64::consts::PI;

use geo_types::{Coord, LineString};

use crate::error::{MeasureError, MeasureResult};
use crate::models::GeoPoint;

/// Mean earth radius used for every measurement unless configured otherwise.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum vertex count for a polygon area.
pub const MIN_POLYGON_POINTS: usize = 3;

/// Great-circle distance in kilometers (haversine).
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    distance_km_with_radius(a, b, EARTH_RADIUS_KM)
}

pub fn distance_km_with_radius(a: &GeoPoint, b: &GeoPoint, earth_radius_km: f64) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = (b.lat() - a.lat()).to_radians();
    let dlng = (b.lng() - a.lng()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    earth_radius_km * c
}

/// Area of the polygon enclosed by `points`, in square kilometers.
///
/// The ring is closed implicitly. Uses the spherical-excess summation
/// `sum((lng2 - lng1) * (2 + sin(lat1) + sin(lat2))) * R² / 2`, which is an
/// approximation for regions small relative to the earth; large polygons are
/// not geodesically exact.
///
/// Fails with [`MeasureError::InsufficientPoints`] for fewer than three points.
pub fn polygon_area_km2(points: &[GeoPoint]) -> MeasureResult<f64> {
    polygon_area_km2_with_radius(points, EARTH_RADIUS_KM)
}

pub fn polygon_area_km2_with_radius(points: &[GeoPoint], earth_radius_km: f64) -> MeasureResult<f64> {
    if points.len() < MIN_POLYGON_POINTS {
        return Err(MeasureError::insufficient_points(MIN_POLYGON_POINTS, points.len()));
    }

    let n = points.len();
    let sum: f64 = (0..n)
        .map(|i| {
            let p1 = &points[i];
            let p2 = &points[(i + 1) % n];
            let lat1 = p1.lat().to_radians();
            let lat2 = p2.lat().to_radians();
            (p2.lng() - p1.lng()).to_radians() * (2.0 + lat1.sin() + lat2.sin())
        })
        .sum();

    Ok(sum.abs() * earth_radius_km * earth_radius_km / 2.0)
}

/// Total length of the polyline through `points`; zero for fewer than two points.
pub fn path_distance_km(points: &[GeoPoint]) -> f64 {
    path_distance_km_with_radius(points, EARTH_RADIUS_KM)
}

pub fn path_distance_km_with_radius(points: &[GeoPoint], earth_radius_km: f64) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_km_with_radius(&pair[0], &pair[1], earth_radius_km))
        .sum()
}

/// Planar area of a circle, `π r²`.
pub fn circle_area_km2(radius_km: f64) -> f64 {
    PI * radius_km * radius_km
}

/// Closed ring of coordinates lying `radius_km` from `center`.
///
/// Each vertex is placed with the spherical destination formula on the same
/// sphere the radius was measured on, so the ring matches the reported radius.
/// Longitudes are continuous around the center and may leave [-180, 180] when
/// the circle crosses the antimeridian. A circle enclosing a pole sweeps a full
/// turn of longitude, so its ring is closed along the pole.
pub fn circle_ring_with_radius(
    center: &GeoPoint,
    radius_km: f64,
    segments: usize,
    earth_radius_km: f64,
) -> LineString<f64> {
    let segments = segments.max(3);
    let lat1 = center.lat().to_radians();
    let lng1 = center.lng().to_radians();
    let delta = radius_km / earth_radius_km;

    let mut coords: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let bearing = 2.0 * PI * i as f64 / segments as f64;
            let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
            let lng2 = lng1
                + (bearing.sin() * delta.sin() * lat1.cos())
                    .atan2(delta.cos() - lat1.sin() * lat2.sin());
            Coord {
                x: lng2.to_degrees(),
                y: lat2.to_degrees(),
            }
        })
        .collect();

    let Some(first) = coords.first().copied() else {
        return LineString::new(coords);
    };
    coords.push(first);
    unwrap_longitudes(&mut coords);

    let closing = coords[coords.len() - 1];
    if (closing.x - first.x).abs() > 180.0 {
        let pole = if center.lat() >= 0.0 { 90.0 } else { -90.0 };
        coords.push(Coord { x: closing.x, y: pole });
        coords.push(Coord { x: first.x, y: pole });
        coords.push(first);
    }
    LineString::new(coords)
}

/// Shifts longitudes by whole turns so every coordinate lies within 180° of
/// the one before it. The first coordinate is left as is.
pub fn unwrap_longitudes(coords: &mut [Coord<f64>]) {
    for i in 1..coords.len() {
        let prev = coords[i - 1].x;
        let mut x = coords[i].x;
        while x - prev > 180.0 {
            x -= 360.0;
        }
        while x - prev < -180.0 {
            x += 360.0;
        }
        coords[i].x = x;
    }
}

/// Reads a flat `[lng, lat, lng, lat, ...]` array into validated points.
pub fn points_from_flat(coordinates: &[f64]) -> MeasureResult<Vec<GeoPoint>> {
    if coordinates.len() % 2 != 0 {
        return Err(MeasureError::InvalidCoordinates(format!(
            "expected [lng, lat] pairs, got {} values",
            coordinates.len()
        )));
    }
    coordinates
        .chunks_exact(2)
        .map(|chunk| GeoPoint::new(chunk[1], chunk[0]))
        .collect()
}
