//! Leg segmentation between consecutive waypoints.
//!
//! ## Forward legs
//! Leg *i* spans `track[b_i ..= b_{i+1}]`, so consecutive legs share their
//! boundary point.
//!
//! ## Round trip
//! An out-and-back track is the forward track followed by its reverse without
//! the pivot (last) point: `forward ++ reverse(forward[..n-1])`, length
//! `2n - 1`. Forward index `k` maps to `2n - 2 - k` in the mirrored half.
//! Backward legs are re-derived over those mirrored indices so every leg's
//! points still run from the round-trip track's start to its end.

use log::{debug, info};

use crate::error::{OptionExt, Result, TrailError};
use crate::spatial::linear_nearest;
use crate::{Boundary, Direction, Leg, TrackPoint, Waypoint};

/// Locate each waypoint in an ordered track.
///
/// Each waypoint maps to its nearest point (lowest index on ties). The result
/// is sorted ascending by index; waypoints sharing an index keep their input
/// order.
pub fn locate_boundaries(track: &[TrackPoint], waypoints: &[Waypoint]) -> Vec<Boundary> {
    let mut boundaries: Vec<Boundary> = waypoints
        .iter()
        .filter_map(|wp| {
            linear_nearest(track, &wp.position).map(|index| Boundary::new(index, &wp.label))
        })
        .collect();
    boundaries.sort_by_key(|b| b.index);

    debug!(
        "[Segmenter] Located {} boundaries: {:?}",
        boundaries.len(),
        boundaries
            .iter()
            .map(|b| format!("{}@{}", b.label, b.index))
            .collect::<Vec<_>>()
    );
    boundaries
}

/// Split an ordered track into forward legs between consecutive boundaries.
pub fn split_forward(track: &[TrackPoint], boundaries: &[Boundary]) -> Result<Vec<Leg>> {
    let sorted = checked_boundaries(track.len(), boundaries)?;

    let legs: Vec<Leg> = sorted
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Leg {
            sequence: (i + 1) as u32,
            direction: Direction::Forward,
            start_label: pair[0].label.clone(),
            end_label: pair[1].label.clone(),
            points: track[pair[0].index..=pair[1].index].to_vec(),
        })
        .collect();

    info!(
        "[Segmenter] Split {} points into {} forward legs",
        track.len(),
        legs.len()
    );
    Ok(legs)
}

/// Build the round-trip track: `forward ++ reverse(forward[..n-1])`.
pub fn round_trip(forward: &[TrackPoint]) -> Vec<TrackPoint> {
    let Some((_, outbound)) = forward.split_last() else {
        return Vec::new();
    };
    let mut track = Vec::with_capacity(forward.len() * 2 - 1);
    track.extend_from_slice(forward);
    track.extend(outbound.iter().rev().cloned());
    track
}

/// Index of forward index `k` in the mirrored half of a round trip built from
/// `n` forward points.
///
/// Maps `0..2n-1` onto itself and is its own inverse.
///
/// # Panics
/// Panics if `n == 0` or `k` is outside the round trip (`k > 2n - 2`).
pub fn mirror_index(k: usize, n: usize) -> usize {
    assert!(
        n > 0 && k + 2 <= 2 * n,
        "index {} is outside a round trip of {} forward points",
        k,
        n
    );
    2 * n - 2 - k
}

/// Split a forward track into the legs of its round trip.
///
/// Forward legs come first in ascending boundary order, then backward legs in
/// descending order. Numbering continues across both groups.
pub fn split_round_trip(track: &[TrackPoint], boundaries: &[Boundary]) -> Result<Vec<Leg>> {
    let sorted = checked_boundaries(track.len(), boundaries)?;
    let n = track.len();
    let full = round_trip(track);

    let mut legs: Vec<Leg> = Vec::with_capacity(2 * (sorted.len() - 1));

    for pair in sorted.windows(2) {
        legs.push(Leg {
            sequence: legs.len() as u32 + 1,
            direction: Direction::Forward,
            start_label: pair[0].label.clone(),
            end_label: pair[1].label.clone(),
            points: full[pair[0].index..=pair[1].index].to_vec(),
        });
    }

    for pair in sorted.windows(2).rev() {
        // The mirror reverses order, so the later boundary comes first
        let start = mirror_index(pair[1].index, n);
        let end = mirror_index(pair[0].index, n);
        legs.push(Leg {
            sequence: legs.len() as u32 + 1,
            direction: Direction::Backward,
            start_label: pair[1].label.clone(),
            end_label: pair[0].label.clone(),
            points: full[start..=end].to_vec(),
        });
    }

    info!(
        "[Segmenter] Split round trip of {} points into {} legs",
        full.len(),
        legs.len()
    );
    Ok(legs)
}

/// Cut a raw track at the point nearest to `waypoint`.
///
/// Both halves include the cut point: the first runs from the start to it,
/// the second from it to the end.
pub fn split_at_waypoint(
    track: &[TrackPoint],
    waypoint: &Waypoint,
) -> Result<(Vec<TrackPoint>, Vec<TrackPoint>)> {
    let cut = linear_nearest(track, &waypoint.position).ok_or_insufficient_points(
        &format!("Track split at '{}'", waypoint.label),
        track.len(),
        1,
    )?;
    debug!(
        "[Segmenter] Cutting {} points at index {} ('{}')",
        track.len(),
        cut,
        waypoint.label
    );
    Ok((track[..=cut].to_vec(), track[cut..].to_vec()))
}

/// Require two or more in-range boundaries; return them sorted by index.
fn checked_boundaries(track_len: usize, boundaries: &[Boundary]) -> Result<Vec<Boundary>> {
    if boundaries.len() < 2 {
        return Err(TrailError::InsufficientBoundaries {
            context: format!("Track of {} points", track_len),
            boundary_count: boundaries.len(),
        });
    }
    if let Some(bad) = boundaries.iter().find(|b| b.index >= track_len) {
        return Err(TrailError::MalformedInput {
            track_id: String::new(),
            message: format!(
                "boundary '{}' at index {} is outside a track of {} points",
                bad.label, bad.index, track_len
            ),
        });
    }

    let mut sorted = boundaries.to_vec();
    sorted.sort_by_key(|b| b.index);
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed_track(n: usize) -> Vec<TrackPoint> {
        (0..n)
            .map(|i| TrackPoint::measured(0.0, i as f64 * 0.001).with_elevation(i as f64))
            .collect()
    }

    fn elevations(leg: &Leg) -> Vec<f64> {
        leg.points.iter().map(|p| p.elevation.unwrap()).collect()
    }

    #[test]
    fn test_split_forward_shares_boundaries() {
        let track = indexed_track(8);
        let boundaries = vec![
            Boundary::new(5, "W2"),
            Boundary::new(2, "W1"),
            Boundary::new(7, "W3"),
        ];
        let legs = split_forward(&track, &boundaries).unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].sequence, 1);
        assert_eq!(legs[0].start_label, "W1");
        assert_eq!(legs[0].end_label, "W2");
        assert_eq!(elevations(&legs[0]), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(elevations(&legs[1]), vec![5.0, 6.0, 7.0]);
        assert!(legs.iter().all(|l| l.direction == Direction::Forward));
    }

    #[test]
    fn test_split_requires_two_boundaries() {
        let track = indexed_track(4);
        let result = split_forward(&track, &[Boundary::new(1, "Only")]);
        assert!(matches!(
            result,
            Err(TrailError::InsufficientBoundaries {
                boundary_count: 1,
                ..
            })
        ));
        assert!(split_round_trip(&track, &[]).is_err());
    }

    #[test]
    fn test_split_rejects_out_of_range_boundary() {
        let track = indexed_track(4);
        let result = split_forward(&track, &[Boundary::new(0, "A"), Boundary::new(4, "B")]);
        assert!(matches!(result, Err(TrailError::MalformedInput { .. })));
    }

    #[test]
    fn test_round_trip_shape() {
        let track = indexed_track(5);
        let full = round_trip(&track);
        assert_eq!(full.len(), 2 * track.len() - 1);
        assert_eq!(full[0], track[0]);
        assert_eq!(full[track.len() - 1], track[track.len() - 1]);
        assert_eq!(full[full.len() - 1], track[0]);
        // Pivot appears exactly once
        assert_eq!(full.iter().filter(|p| p.elevation == Some(4.0)).count(), 1);

        assert!(round_trip(&[]).is_empty());
        assert_eq!(round_trip(&track[..1]).len(), 1);
    }

    #[test]
    fn test_mirror_index_is_involution() {
        let n = 8;
        assert_eq!(mirror_index(2, n), 12);
        assert_eq!(mirror_index(5, n), 9);
        assert_eq!(mirror_index(n - 1, n), n - 1);
        for k in 0..(2 * n - 1) {
            assert_eq!(mirror_index(mirror_index(k, n), n), k);
        }
    }

    #[test]
    #[should_panic(expected = "outside a round trip")]
    fn test_mirror_index_past_end_panics() {
        mirror_index(15, 8);
    }

    #[test]
    #[should_panic(expected = "outside a round trip")]
    fn test_mirror_index_empty_track_panics() {
        mirror_index(0, 0);
    }

    #[test]
    fn test_split_round_trip_legs() {
        let track = indexed_track(8);
        let boundaries = vec![Boundary::new(2, "W1"), Boundary::new(5, "W2")];
        let legs = split_round_trip(&track, &boundaries).unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].direction, Direction::Forward);
        assert_eq!(elevations(&legs[0]), vec![2.0, 3.0, 4.0, 5.0]);

        let back = &legs[1];
        assert_eq!(back.sequence, 2);
        assert_eq!(back.direction, Direction::Backward);
        assert_eq!(back.start_label, "W2");
        assert_eq!(back.end_label, "W1");
        // Spans [9..=12] of the round trip, walking from W2 back to W1
        assert_eq!(elevations(back), vec![5.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_split_round_trip_numbering_and_order() {
        let track = indexed_track(6);
        let boundaries = vec![
            Boundary::new(0, "A"),
            Boundary::new(2, "B"),
            Boundary::new(5, "C"),
        ];
        let legs = split_round_trip(&track, &boundaries).unwrap();
        let summary: Vec<(u32, Direction, &str, &str)> = legs
            .iter()
            .map(|l| (l.sequence, l.direction, l.start_label.as_str(), l.end_label.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, Direction::Forward, "A", "B"),
                (2, Direction::Forward, "B", "C"),
                (3, Direction::Backward, "C", "B"),
                (4, Direction::Backward, "B", "A"),
            ]
        );
        // Last backward leg ends at the round trip's final point
        assert_eq!(elevations(&legs[3]), vec![2.0, 1.0, 0.0]);
        assert_eq!(elevations(&legs[2]), vec![5.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_locate_boundaries_sorted() {
        let track = indexed_track(10);
        let waypoints = vec![
            Waypoint::new("Late", 0.0, 0.0071),
            Waypoint::new("Early", 0.0, 0.0019),
        ];
        let boundaries = locate_boundaries(&track, &waypoints);
        assert_eq!(
            boundaries,
            vec![Boundary::new(2, "Early"), Boundary::new(7, "Late")]
        );
    }

    #[test]
    fn test_split_at_waypoint_keeps_cut_point_in_both() {
        let track = indexed_track(6);
        let (a, b) = split_at_waypoint(&track, &Waypoint::new("Summit", 0.0, 0.0032)).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(b.len(), 3);
        assert_eq!(a.last(), b.first());
        assert!(split_at_waypoint(&[], &Waypoint::new("X", 0.0, 0.0)).is_err());
    }
}
