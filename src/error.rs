//! Unified error handling for the trail-segmenter library.
//!
//! Every pipeline stage reports failures through [`TrailError`]. Errors are
//! scoped to a single track or leg: the batch API turns them into labeled
//! outcomes so one bad input never stops the rest of a run.

use thiserror::Error;

/// Unified error type for trail-segmenter operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrailError {
    /// A point or waypoint is unusable (bad coordinates, missing label).
    #[error("Track '{track_id}' has malformed input: {message}")]
    MalformedInput { track_id: String, message: String },

    /// A track or leg has too few points for a delta/segment computation.
    #[error("{context} has {point_count} points, minimum {minimum_required} required")]
    InsufficientPoints {
        context: String,
        point_count: usize,
        minimum_required: usize,
    },

    /// Fewer than two boundary waypoints were supplied to the segmenter.
    #[error("{context} has {boundary_count} boundaries, at least 2 required")]
    InsufficientBoundaries {
        context: String,
        boundary_count: usize,
    },

    /// Neither side of a gap carries a usable value.
    ///
    /// Not fatal: the field stays absent. Only surfaced as a diagnostic.
    #[error("No bracketing {field} value around point {index}")]
    AmbiguousInterpolation { index: usize, field: GapField },

    /// Configuration could not be parsed or is inconsistent.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// The point attribute a gap refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapField {
    Elevation,
    Time,
}

impl std::fmt::Display for GapField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapField::Elevation => write!(f, "elevation"),
            GapField::Time => write!(f, "time"),
        }
    }
}

impl TrailError {
    /// Whether processing of the track/leg can continue past this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TrailError::AmbiguousInterpolation { .. })
    }

    /// Attach a track id to a malformed-input error raised without one.
    pub fn with_track_id(self, id: &str) -> Self {
        match self {
            TrailError::MalformedInput { track_id, message } if track_id.is_empty() => {
                TrailError::MalformedInput {
                    track_id: id.to_string(),
                    message,
                }
            }
            other => other,
        }
    }
}

/// Result type alias for trail-segmenter operations.
pub type Result<T> = std::result::Result<T, TrailError>;

/// Extension trait for converting Option to TrailError.
pub trait OptionExt<T> {
    /// Convert Option to Result with insufficient points error.
    fn ok_or_insufficient_points(
        self,
        context: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T>;

    /// Convert Option to Result with malformed input error.
    fn ok_or_malformed(self, track_id: &str, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        context: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T> {
        self.ok_or_else(|| TrailError::InsufficientPoints {
            context: context.to_string(),
            point_count,
            minimum_required: minimum,
        })
    }

    fn ok_or_malformed(self, track_id: &str, message: &str) -> Result<T> {
        self.ok_or_else(|| TrailError::MalformedInput {
            track_id: track_id.to_string(),
            message: message.to_string(),
        })
    }
}
