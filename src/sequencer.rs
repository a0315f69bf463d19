//! Merging projected waypoints into a track and ordering the result.

use chrono::Duration;
use log::{debug, info};

use crate::error::{Result, TrailError};
use crate::interpolate::{project, project_with_index};
use crate::spatial::{IndexPolicy, TrackIndex};
use crate::{TrackPoint, Waypoint};

/// Untimed points sort this long after the latest timestamp.
const UNTIMED_OFFSET_HOURS: i64 = 1;

/// A track point with its insertion key.
///
/// Measured points use their base index; projected waypoints use
/// `matched_index + 0.5` so they land right after their matched point when no
/// timestamps are available.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedPoint {
    pub point: TrackPoint,
    pub insert_key: f64,
}

/// Wrap a plain track, keyed by position.
pub fn sequence_track(points: &[TrackPoint]) -> Vec<SequencedPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| SequencedPoint {
            point: p.clone(),
            insert_key: i as f64,
        })
        .collect()
}

/// Append every waypoint, projected onto `track`, after the track's points.
///
/// The result has `track.len() + waypoints.len()` entries and is not yet
/// ordered; pass it to [`order`].
pub fn merge_waypoints(
    track: &[TrackPoint],
    waypoints: &[Waypoint],
    policy: &IndexPolicy,
) -> Result<Vec<SequencedPoint>> {
    if track.len() < 2 {
        return Err(TrailError::InsufficientPoints {
            context: "Base track".to_string(),
            point_count: track.len(),
            minimum_required: 2,
        });
    }

    let index = policy.use_index(track.len()).then(|| TrackIndex::build(track));

    let mut merged = sequence_track(track);
    merged.reserve(waypoints.len());

    for waypoint in waypoints {
        let projection = match &index {
            Some(index) => project_with_index(waypoint, track, index)?,
            None => project(waypoint, track)?,
        };
        merged.push(SequencedPoint {
            insert_key: projection.matched_index as f64 + 0.5,
            point: projection.point,
        });
    }

    info!(
        "[Sequencer] Merged {} waypoints into {} track points (spatial index: {})",
        waypoints.len(),
        track.len(),
        index.is_some()
    );

    Ok(merged)
}

/// Order merged points.
///
/// With any timestamp present, points sort by time and untimed points go after
/// the latest time. Without timestamps they sort by insertion key. Both sorts
/// are stable, so ties keep their input order.
pub fn order(points: Vec<SequencedPoint>) -> Vec<TrackPoint> {
    let mut points = points;

    match points.iter().filter_map(|p| p.point.time).max() {
        Some(latest) => {
            let untimed_key = latest + Duration::hours(UNTIMED_OFFSET_HOURS);
            debug!("[Sequencer] Ordering {} points by time", points.len());
            points.sort_by_key(|p| p.point.time.unwrap_or(untimed_key));
        }
        None => {
            debug!("[Sequencer] Ordering {} points by insertion key", points.len());
            points.sort_by(|a, b| a.insert_key.total_cmp(&b.insert_key));
        }
    }

    points.into_iter().map(|p| p.point).collect()
}
