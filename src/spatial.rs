//! R-tree indexed track points and nearest-point queries.
//!
//! Nearest-point matching is O(waypoints × track length) with a linear scan.
//! That is fine for trail-scale tracks; longer tracks go through an R-tree
//! instead. Both paths return the same index, including the tie-break
//! (lowest index wins).

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::{GpsPoint, TrackPoint};

/// A track point with its index for R-tree queries
#[derive(Debug, Clone, Copy)]
pub struct IndexedPoint {
    pub idx: usize,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// When to switch from a linear scan to the R-tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexPolicy {
    /// Tracks with at least this many points are indexed.
    /// Default: 512
    pub spatial_index_min_points: usize,
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self {
            spatial_index_min_points: 512,
        }
    }
}

impl IndexPolicy {
    /// Whether a track of `len` points should be indexed.
    pub fn use_index(&self, len: usize) -> bool {
        len >= self.spatial_index_min_points
    }
}

/// Spatial index over the points of one track.
pub struct TrackIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl TrackIndex {
    /// Build R-tree from track points for efficient nearest-point queries
    pub fn build(points: &[TrackPoint]) -> Self {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint {
                idx: i,
                lat: p.position.latitude,
                lng: p.position.longitude,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
            len: points.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the point nearest to `target`, lowest index on ties.
    pub fn nearest(&self, target: &GpsPoint) -> Option<usize> {
        let query = [target.latitude, target.longitude];
        let best = self.tree.nearest_neighbor(&query)?.distance_2(&query);

        // Every point at exactly the best distance is a candidate
        self.tree
            .locate_within_distance(query, best)
            .map(|p| p.idx)
            .min()
    }
}

fn proximity_distance_2(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlng = a.longitude - b.longitude;
    dlat * dlat + dlng * dlng
}

/// Linear-scan nearest point, lowest index on ties.
pub fn linear_nearest(points: &[TrackPoint], target: &GpsPoint) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
        // Same metric as IndexedPoint::distance_2
        let d = proximity_distance_2(&p.position, target);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}
