//! # Trail Segmenter
//!
//! Waypoint projection, leg segmentation and slope statistics for hiking-trail
//! GPS recordings.
//!
//! This library provides:
//! - Nearest-point projection of named waypoints onto a recorded track, with
//!   elevation/time interpolation
//! - Gap filling for interior points missing elevation or time
//! - Time-based (or insertion-based) ordering of the merged track
//! - Leg segmentation between consecutive waypoints, forward or round trip
//! - Per-leg distance, elevation and slope features
//!
//! ## Features
//!
//! - **`parallel`** - Process batches of tracks in parallel with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trail_segmenter::{
//!     process_track, PipelineConfig, TrackInput, TrackPoint, Waypoint,
//! };
//!
//! let points: Vec<TrackPoint> = (0..6)
//!     .map(|i| TrackPoint::measured(24.0 + i as f64 * 0.001, 121.0).with_elevation(1000.0 + i as f64 * 5.0))
//!     .collect();
//! let waypoints = vec![
//!     Waypoint::new("Trailhead", 24.0, 121.0),
//!     Waypoint::new("Summit", 24.005, 121.0),
//! ];
//!
//! let input = TrackInput::new("demo", points, waypoints);
//! let report = process_track(&input, &PipelineConfig::default()).unwrap();
//! assert_eq!(report.routes[0].legs.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{GapField, OptionExt, Result, TrailError};

// Geographic utilities (distance, rounding, line conversion)
pub mod geo_utils;

// R-tree nearest-point index for long tracks
pub mod spatial;
pub use spatial::{IndexPolicy, TrackIndex};

// Waypoint projection and gap filling
pub mod interpolate;
pub use interpolate::{fill_gaps, fill_gaps_detailed, project, GapFillStats, Projection};

// Merge and ordering of track points with projected waypoints
pub mod sequencer;
pub use sequencer::{merge_waypoints, order, SequencedPoint};

// Leg segmentation (forward and round trip)
pub mod segmenter;
pub use segmenter::{
    locate_boundaries, mirror_index, round_trip, split_at_waypoint, split_forward,
    split_round_trip,
};

// Per-leg feature extraction
pub mod features;
pub use features::{
    extract_features, extract_features_with_reference, DistanceSource, FeatureConfig,
    FeatureRecord, SlopeBin, SlopeHistogram,
};

// End-to-end processing of one or many tracks
pub mod pipeline;
#[cfg(feature = "parallel")]
pub use pipeline::process_tracks_parallel;
pub use pipeline::{
    process_track, process_tracks, LegReport, PipelineConfig, RouteReport, SplitMode,
    TrackInput, TrackOutcome, TrackReport,
};

// Algorithm toolbox - flat access to the core operations
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trail_segmenter::GpsPoint;
/// let point = GpsPoint::new(23.4700, 120.9570); // Yushan
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Where a track point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOrigin {
    /// Recorded by the GPS device
    Measured,
    /// A projected waypoint
    Waypoint,
}

/// A single point of a track.
///
/// Stages never mutate points in place; gap filling and projection produce
/// new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position: GpsPoint,
    /// Elevation in meters
    pub elevation: Option<f64>,
    /// UTC timestamp
    pub time: Option<DateTime<Utc>>,
    pub origin: PointOrigin,
    /// Waypoint label (None for measured points)
    pub label: Option<String>,
}

impl TrackPoint {
    /// Create a measured point with no elevation or time.
    pub fn measured(latitude: f64, longitude: f64) -> Self {
        Self {
            position: GpsPoint::new(latitude, longitude),
            elevation: None,
            time: None,
            origin: PointOrigin::Measured,
            label: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn is_waypoint(&self) -> bool {
        self.origin == PointOrigin::Waypoint
    }
}

/// A manually recorded, named point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: GpsPoint,
    pub label: String,
    /// Authoritative elevation; overrides interpolated values when present
    pub elevation: Option<f64>,
}

impl Waypoint {
    pub fn new(label: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            position: GpsPoint::new(latitude, longitude),
            label: label.to_string(),
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }
}

/// The position of a waypoint inside an ordered track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub index: usize,
    pub label: String,
}

impl Boundary {
    pub fn new(index: usize, label: &str) -> Self {
        Self {
            index,
            label: label.to_string(),
        }
    }
}

/// Direction of travel for a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// A trail segment bounded by two consecutive waypoints.
///
/// The points are an owned copy: boundary points are included on both ends,
/// so adjacent legs share their boundary point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// 1-based sequence number within the route
    pub sequence: u32,
    pub direction: Direction,
    pub start_label: String,
    pub end_label: String,
    pub points: Vec<TrackPoint>,
}

impl Leg {
    /// Number of points in the leg.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The leg as a `geo` line (x = longitude, y = latitude).
    pub fn line_string(&self) -> geo::LineString<f64> {
        geo_utils::to_line_string(&self.points)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(23.47, 120.957).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_track_point_builders() {
        let p = TrackPoint::measured(24.0, 121.0).with_elevation(1200.0);
        assert_eq!(p.elevation, Some(1200.0));
        assert_eq!(p.time, None);
        assert!(!p.is_waypoint());
    }

    #[test]
    fn test_leg_line_string_is_lon_lat() {
        let leg = Leg {
            sequence: 1,
            direction: Direction::Forward,
            start_label: "A".to_string(),
            end_label: "B".to_string(),
            points: vec![
                TrackPoint::measured(24.0, 121.0),
                TrackPoint::measured(24.1, 121.2),
            ],
        };
        let line = leg.line_string();
        assert_eq!(line.0.len(), 2);
        assert_eq!(line.0[1].x, 121.2);
        assert_eq!(line.0[1].y, 24.1);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Direction::Backward).unwrap();
        assert_eq!(json, "\"backward\"");
        let json = serde_json::to_string(&PointOrigin::Waypoint).unwrap();
        assert_eq!(json, "\"waypoint\"");
    }
}
