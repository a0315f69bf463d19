//! Waypoint projection and gap filling.
//!
//! ## Projection
//! A waypoint is matched to the nearest track point (planar proximity,
//! lowest index on ties). Its elevation and time are interpolated from the
//! segment before the matched point, then the segment after it, and finally
//! copied from the matched point itself.
//!
//! ## Gap filling
//! Interior points missing elevation or time are interpolated between the
//! nearest earlier and later points that carry the value, weighted by
//! cumulative great-circle distance. Leading and trailing gaps stay empty.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::error::{GapField, OptionExt, Result, TrailError};
use crate::geo_utils::{haversine_distance, proximity_distance, round_to};
use crate::spatial::{linear_nearest, TrackIndex};
use crate::{GpsPoint, PointOrigin, TrackPoint, Waypoint};

/// A waypoint projected onto a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Index of the nearest track point
    pub matched_index: usize,
    /// The waypoint as a track point, elevation/time filled where possible
    pub point: TrackPoint,
}

/// Project a waypoint onto a track using a linear nearest-point scan.
///
/// # Example
/// ```
/// use trail_segmenter::{project, TrackPoint, Waypoint};
///
/// let track = vec![
///     TrackPoint::measured(0.0, 0.0).with_elevation(100.0),
///     TrackPoint::measured(0.0, 0.002).with_elevation(120.0),
/// ];
/// let wp = Waypoint::new("Cabin", 0.0, 0.0015);
/// let projection = project(&wp, &track).unwrap();
/// assert_eq!(projection.matched_index, 1);
/// assert_eq!(projection.point.elevation, Some(115.0));
/// ```
pub fn project(waypoint: &Waypoint, track: &[TrackPoint]) -> Result<Projection> {
    let matched = linear_nearest(track, &waypoint.position).ok_or_insufficient_points(
        &format!("Track for waypoint '{}'", waypoint.label),
        track.len(),
        1,
    )?;
    Ok(project_at(waypoint, track, matched))
}

/// Project a waypoint using a prebuilt spatial index over `track`.
///
/// Gives the same result as [`project`].
pub fn project_with_index(
    waypoint: &Waypoint,
    track: &[TrackPoint],
    index: &TrackIndex,
) -> Result<Projection> {
    let matched = index
        .nearest(&waypoint.position)
        .filter(|&i| i < track.len())
        .ok_or_insufficient_points(
            &format!("Track for waypoint '{}'", waypoint.label),
            track.len(),
            1,
        )?;
    Ok(project_at(waypoint, track, matched))
}

fn project_at(waypoint: &Waypoint, track: &[TrackPoint], matched: usize) -> Projection {
    let closest = &track[matched];
    let prev = matched.checked_sub(1).map(|i| &track[i]);
    let next = track.get(matched + 1);
    let target = &waypoint.position;

    let elevation = match waypoint.elevation {
        Some(authoritative) => Some(authoritative),
        None => bracketed_value(prev, closest, next, target, |p| p.elevation, blend_elevation),
    };
    let time = bracketed_value(prev, closest, next, target, |p| p.time, blend_time);

    debug!(
        "[Projector] '{}' matched index {} (elevation={:?}, time={:?})",
        waypoint.label, matched, elevation, time
    );

    Projection {
        matched_index: matched,
        point: TrackPoint {
            position: waypoint.position,
            elevation,
            time,
            origin: PointOrigin::Waypoint,
            label: Some(waypoint.label.clone()),
        },
    }
}

/// Interpolate over (prev, closest), then (closest, next), then fall back to
/// the closest point's own value.
fn bracketed_value<T: Copy>(
    prev: Option<&TrackPoint>,
    closest: &TrackPoint,
    next: Option<&TrackPoint>,
    target: &GpsPoint,
    value: impl Fn(&TrackPoint) -> Option<T>,
    blend: impl Fn(T, T, f64) -> T,
) -> Option<T> {
    let pairs = [prev.map(|p| (p, closest)), next.map(|n| (closest, n))];

    for (a, b) in pairs.into_iter().flatten() {
        if let (Some(va), Some(vb)) = (value(a), value(b)) {
            if let Some(ratio) = projection_ratio(a, b, target) {
                return Some(blend(va, vb, ratio));
            }
        }
    }

    value(closest)
}

/// Position of `target` along (a, b) in proximity units, clamped to [0, 1].
/// None when a and b coincide.
fn projection_ratio(a: &TrackPoint, b: &TrackPoint, target: &GpsPoint) -> Option<f64> {
    let span = proximity_distance(&a.position, &b.position);
    if span <= 0.0 {
        return None;
    }
    Some((proximity_distance(&a.position, target) / span).clamp(0.0, 1.0))
}

fn blend_elevation(a: f64, b: f64, ratio: f64) -> f64 {
    round_to(a + (b - a) * ratio, 1)
}

fn blend_time(a: DateTime<Utc>, b: DateTime<Utc>, ratio: f64) -> DateTime<Utc> {
    let span_ms = (b - a).num_milliseconds() as f64;
    a + Duration::milliseconds((span_ms * ratio).round() as i64)
}

// ============================================================================
// Gap filling
// ============================================================================

/// Summary of a gap-filling pass.
#[derive(Debug, Clone, Default)]
pub struct GapFillStats {
    pub filled_elevations: usize,
    pub filled_times: usize,
    /// Gaps with no value on one or both sides (non-fatal diagnostics)
    pub unresolved: Vec<TrailError>,
}

/// Fill interior elevation/time gaps. The output has the input's length.
pub fn fill_gaps(track: &[TrackPoint]) -> Vec<TrackPoint> {
    fill_gaps_detailed(track).0
}

/// Fill interior elevation/time gaps and report what was and wasn't filled.
pub fn fill_gaps_detailed(track: &[TrackPoint]) -> (Vec<TrackPoint>, GapFillStats) {
    let cumulative = cumulative_distances(track);

    let elevations = fill_field(track, &cumulative, |p| p.elevation, blend_elevation);
    let times = fill_field(track, &cumulative, |p| p.time, blend_time);

    let mut stats = GapFillStats {
        filled_elevations: elevations.filled,
        filled_times: times.filled,
        unresolved: Vec::new(),
    };
    stats
        .unresolved
        .extend(elevations.unresolved.iter().map(|&index| TrailError::AmbiguousInterpolation {
            index,
            field: GapField::Elevation,
        }));
    stats
        .unresolved
        .extend(times.unresolved.iter().map(|&index| TrailError::AmbiguousInterpolation {
            index,
            field: GapField::Time,
        }));

    let filled: Vec<TrackPoint> = track
        .iter()
        .zip(elevations.values)
        .zip(times.values)
        .map(|((p, elevation), time)| TrackPoint {
            elevation,
            time,
            ..p.clone()
        })
        .collect();

    if !stats.unresolved.is_empty() {
        debug!(
            "[Interpolator] {} gaps left unfilled (no bracketing value)",
            stats.unresolved.len()
        );
    }
    debug!(
        "[Interpolator] Filled {} elevations, {} times over {} points",
        stats.filled_elevations,
        stats.filled_times,
        track.len()
    );

    (filled, stats)
}

struct FieldFill<T> {
    values: Vec<Option<T>>,
    filled: usize,
    unresolved: Vec<usize>,
}

/// Cumulative great-circle distance from the first point to each point.
fn cumulative_distances(track: &[TrackPoint]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(track.len());
    let mut total = 0.0;
    for (i, p) in track.iter().enumerate() {
        if i > 0 {
            total += haversine_distance(&track[i - 1].position, &p.position);
        }
        cumulative.push(total);
    }
    cumulative
}

fn fill_field<T: Copy>(
    track: &[TrackPoint],
    cumulative: &[f64],
    value: impl Fn(&TrackPoint) -> Option<T>,
    blend: impl Fn(T, T, f64) -> T,
) -> FieldFill<T> {
    let original: Vec<Option<T>> = track.iter().map(&value).collect();
    let n = original.len();

    // Nearest known index at or after each position
    let mut next_known = vec![None; n];
    let mut upcoming = None;
    for i in (0..n).rev() {
        if original[i].is_some() {
            upcoming = Some(i);
        }
        next_known[i] = upcoming;
    }

    let mut values = original.clone();
    let mut filled = 0;
    let mut unresolved = Vec::new();
    let mut prev_known: Option<usize> = None;

    for i in 0..n {
        if original[i].is_some() {
            prev_known = Some(i);
            continue;
        }

        let (Some(lo), Some(hi)) = (prev_known, next_known[i]) else {
            unresolved.push(i);
            continue;
        };

        let span = cumulative[hi] - cumulative[lo];
        if span <= 0.0 {
            continue;
        }
        let ratio = (cumulative[i] - cumulative[lo]) / span;

        if let (Some(a), Some(b)) = (original[lo], original[hi]) {
            values[i] = Some(blend(a, b, ratio));
            filled += 1;
        }
    }

    FieldFill {
        values,
        filled,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 5, 6, 0, 0).unwrap()
    }

    fn equator_track(n: usize) -> Vec<TrackPoint> {
        (0..n)
            .map(|i| TrackPoint::measured(0.0, i as f64 * 0.001))
            .collect()
    }

    #[test]
    fn test_project_matches_nearest_and_interpolates_prev_pair() {
        let track = vec![
            TrackPoint::measured(0.0, 0.0)
                .with_elevation(100.0)
                .with_time(t0()),
            TrackPoint::measured(0.0, 0.001)
                .with_elevation(110.0)
                .with_time(t0() + Duration::seconds(100)),
            TrackPoint::measured(0.0, 0.002)
                .with_elevation(130.0)
                .with_time(t0() + Duration::seconds(200)),
        ];
        // Nearest is index 1; ratio over (0, 1) = 0.0009 / 0.001
        let wp = Waypoint::new("Junction", 0.0, 0.0009);
        let projection = project(&wp, &track).unwrap();

        assert_eq!(projection.matched_index, 1);
        assert_eq!(projection.point.origin, PointOrigin::Waypoint);
        assert_eq!(projection.point.label.as_deref(), Some("Junction"));
        assert_eq!(projection.point.elevation, Some(109.0));
        assert_eq!(projection.point.time, Some(t0() + Duration::seconds(90)));
    }

    #[test]
    fn test_project_falls_back_to_next_pair() {
        let track = vec![
            TrackPoint::measured(0.0, 0.0),
            TrackPoint::measured(0.0, 0.001).with_elevation(200.0),
            TrackPoint::measured(0.0, 0.002).with_elevation(220.0),
        ];
        // prev lacks elevation, so (closest, next) is used
        let wp = Waypoint::new("Spring", 0.0, 0.0011);
        let projection = project(&wp, &track).unwrap();
        assert_eq!(projection.matched_index, 1);
        assert_eq!(projection.point.elevation, Some(202.0));
        assert_eq!(projection.point.time, None);
    }

    #[test]
    fn test_project_falls_back_to_closest_value() {
        let track = vec![
            TrackPoint::measured(0.0, 0.0),
            TrackPoint::measured(0.0, 0.001).with_elevation(300.0),
            TrackPoint::measured(0.0, 0.002),
        ];
        let wp = Waypoint::new("Saddle", 0.0, 0.001);
        let projection = project(&wp, &track).unwrap();
        assert_eq!(projection.point.elevation, Some(300.0));
    }

    #[test]
    fn test_waypoint_elevation_is_authoritative() {
        let track = vec![
            TrackPoint::measured(0.0, 0.0).with_elevation(100.0),
            TrackPoint::measured(0.0, 0.001).with_elevation(110.0),
        ];
        let wp = Waypoint::new("Peak", 0.0, 0.0005).with_elevation(512.0);
        let projection = project(&wp, &track).unwrap();
        assert_eq!(projection.point.elevation, Some(512.0));
    }

    #[test]
    fn test_project_ratio_is_clamped() {
        let track = vec![
            TrackPoint::measured(0.0, 0.0).with_elevation(100.0),
            TrackPoint::measured(0.0, 0.001).with_elevation(200.0),
        ];
        // Beyond the last point: pair (0, 1) ratio would be 1.5
        let wp = Waypoint::new("Overshoot", 0.0, 0.0015);
        let projection = project(&wp, &track).unwrap();
        assert_eq!(projection.matched_index, 1);
        assert_eq!(projection.point.elevation, Some(200.0));
    }

    #[test]
    fn test_project_empty_track_fails() {
        let wp = Waypoint::new("Nowhere", 0.0, 0.0);
        assert!(matches!(
            project(&wp, &[]),
            Err(TrailError::InsufficientPoints { .. })
        ));
    }

    #[test]
    fn test_project_with_index_agrees() {
        let track: Vec<TrackPoint> = (0..100)
            .map(|i| {
                TrackPoint::measured(24.0 + i as f64 * 0.0004, 121.0 + (i % 7) as f64 * 0.0001)
                    .with_elevation(1000.0 + i as f64)
            })
            .collect();
        let index = TrackIndex::build(&track);
        for k in 0..20 {
            let wp = Waypoint::new("W", 24.0 + k as f64 * 0.0019, 121.00033);
            assert_eq!(
                project(&wp, &track).unwrap(),
                project_with_index(&wp, &track, &index).unwrap()
            );
        }
    }

    #[test]
    fn test_gap_fill_midpoint() {
        let mut track = equator_track(5);
        track[0] = track[0].clone().with_elevation(100.0).with_time(t0());
        track[4] = track[4]
            .clone()
            .with_elevation(140.0)
            .with_time(t0() + Duration::seconds(40));

        let (filled, stats) = fill_gaps_detailed(&track);
        assert_eq!(filled.len(), 5);
        assert_eq!(filled[2].elevation, Some(120.0));
        assert_eq!(filled[2].time, Some(t0() + Duration::seconds(20)));
        assert_eq!(filled[1].elevation, Some(110.0));
        assert_eq!(stats.filled_elevations, 3);
        assert_eq!(stats.filled_times, 3);
        assert!(stats.unresolved.is_empty());
    }

    #[test]
    fn test_gap_fill_leaves_edges_empty() {
        let mut track = equator_track(5);
        track[2] = track[2].clone().with_elevation(50.0);

        let (filled, stats) = fill_gaps_detailed(&track);
        assert_eq!(filled[0].elevation, None);
        assert_eq!(filled[4].elevation, None);
        assert_eq!(filled[2].elevation, Some(50.0));
        // 4 elevation gaps plus 5 time gaps, none bracketed
        assert_eq!(stats.unresolved.len(), 9);
        assert!(stats.unresolved.iter().all(|e| !e.is_fatal()));
    }

    #[test]
    fn test_gap_fill_does_not_touch_input() {
        let mut track = equator_track(3);
        track[0] = track[0].clone().with_elevation(10.0);
        track[2] = track[2].clone().with_elevation(30.0);
        let before = track.clone();
        let filled = fill_gaps(&track);
        assert_eq!(track, before);
        assert_eq!(filled[1].elevation, Some(20.0));
    }
}
