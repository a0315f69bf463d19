//! Geographic utilities shared by every stage.
//!
//! Two distance functions live here:
//! - [`haversine_distance`] is the metric great-circle distance used for
//!   every reported value.
//! - [`proximity_distance`] is a planar distance in degree space used only to
//!   rank nearest-point candidates and to compute projection ratios.

use geo::{Coord, LineString};

use crate::{GpsPoint, TrackPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two GPS points in meters.
///
/// Coordinates are not validated; out-of-range input gives an unspecified
/// (but finite) result.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlng = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Euclidean distance in degree space.
///
/// Not a metric distance: only meaningful for ranking close candidates.
pub fn proximity_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let dlat = p1.latitude - p2.latitude;
    let dlng = p1.longitude - p2.longitude;
    (dlat * dlat + dlng * dlng).sqrt()
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Total length of a track in meters.
pub fn track_length(points: &[TrackPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0].position, &w[1].position))
        .sum()
}

/// Haversine length of a `geo` line with x = longitude, y = latitude.
pub fn line_string_length(line: &LineString<f64>) -> f64 {
    line.0
        .windows(2)
        .map(|w| {
            haversine_distance(
                &GpsPoint::new(w[0].y, w[0].x),
                &GpsPoint::new(w[1].y, w[1].x),
            )
        })
        .sum()
}

/// Convert track points to a `geo` line (x = longitude, y = latitude).
pub fn to_line_string(points: &[TrackPoint]) -> LineString<f64> {
    LineString::new(
        points
            .iter()
            .map(|p| Coord {
                x: p.position.longitude,
                y: p.position.latitude,
            })
            .collect(),
    )
}

/// Round half away from zero to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_equator_millidegree() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.0, 0.001);
        let d = haversine_distance(&a, &b);
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_haversine_uses_6371km_radius() {
        // One degree of longitude on the equator is R * pi / 180
        let d = haversine_distance(&GpsPoint::new(0.0, 0.0), &GpsPoint::new(0.0, 1.0));
        assert!((d - 111_194.93).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_haversine_symmetric_and_zero() {
        let a = GpsPoint::new(23.47, 120.957);
        let b = GpsPoint::new(23.48, 120.96);
        assert_eq!(haversine_distance(&a, &a), 0.0);
        assert!((haversine_distance(&a, &b) - haversine_distance(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_proximity_is_planar_degrees() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = GpsPoint::new(0.003, 0.004);
        assert!((proximity_distance(&a, &b) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_line_string_length_matches_track_length() {
        let points: Vec<TrackPoint> = (0..5)
            .map(|i| TrackPoint::measured(24.0 + i as f64 * 0.001, 121.0))
            .collect();
        let line = to_line_string(&points);
        assert!((line_string_length(&line) - track_length(&points)).abs() < 1e-9);
        assert!(track_length(&points[..1]) == 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(111.194_9, 2), 111.19);
        assert_eq!(round_to(-2.25, 1), -2.3);
        assert_eq!(round_to(120.04, 1), 120.0);
    }
}
