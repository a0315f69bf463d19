//! # Algorithm Toolbox
//!
//! Flat access to every stage of the trail pipeline. Use these to run a single
//! stage (projection, ordering, segmentation, features) inside your own
//! tooling without going through [`crate::process_track`].
//!
//! ## Core Algorithms
//!
//! - **Projection**: Nearest-point waypoint projection with interpolation
//! - **Gap Filling**: Distance-weighted elevation/time fill
//! - **Sequencing**: Merge and time/insertion ordering
//! - **Segmentation**: Forward and round-trip legs
//! - **Features**: Distance, elevation and slope statistics
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Polyline Length**: Total distance along a path
//!
//! # Example
//!
//! ```rust
//! use trail_segmenter::algorithms::{haversine_distance, mirror_index, GpsPoint};
//!
//! let paiyun = GpsPoint::new(23.4690, 120.9560);
//! let summit = GpsPoint::new(23.4700, 120.9570);
//! let distance = haversine_distance(&paiyun, &summit);
//! assert!(distance > 100.0 && distance < 200.0);
//!
//! // Forward index 2 of an 8-point track in its round trip
//! assert_eq!(mirror_index(2, 8), 12);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    Boundary, Direction, GpsPoint, Leg, PointOrigin, TrackPoint, Waypoint,
};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    haversine_distance, line_string_length, polyline_length, round_to, to_line_string,
    track_length, EARTH_RADIUS_M,
};

// =============================================================================
// Projection and Gap Filling
// =============================================================================

/// Project a waypoint onto its nearest track point.
///
/// Elevation and time are interpolated between the matched point and its
/// predecessor, falling back to the successor, then to the matched point's
/// own values.
pub use crate::interpolate::project;

/// Projection using a prebuilt R-tree, for long tracks.
pub use crate::interpolate::project_with_index;

/// Fill interior elevation/time gaps by cumulative distance.
pub use crate::interpolate::{fill_gaps, fill_gaps_detailed, GapFillStats, Projection};

/// Nearest-point lookups (linear scan and R-tree).
pub use crate::spatial::{linear_nearest, IndexPolicy, TrackIndex};

// =============================================================================
// Sequencing
// =============================================================================

/// Merge projected waypoints into a track and order the result.
///
/// Ordering is by time when any point is timed (untimed points last, in input
/// order), otherwise by insertion key.
pub use crate::sequencer::{merge_waypoints, order, sequence_track, SequencedPoint};

// =============================================================================
// Segmentation
// =============================================================================

/// Locate waypoints in an ordered track and split it into legs.
pub use crate::segmenter::{
    locate_boundaries, mirror_index, round_trip, split_at_waypoint, split_forward,
    split_round_trip,
};

// =============================================================================
// Feature Extraction
// =============================================================================

/// Per-leg distance, elevation and slope statistics.
pub use crate::features::{
    extract_features, extract_features_with_reference, DistanceSource, FeatureConfig,
    FeatureRecord, SlopeBin, SlopeHistogram,
};
