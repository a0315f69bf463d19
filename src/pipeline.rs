//! End-to-end processing of hiking tracks.
//!
//! Each track runs through the stages strictly in order:
//! validate → (split at last waypoint) → fill gaps → merge waypoints → order
//! → locate boundaries → split into legs → extract features.
//!
//! Tracks are independent. [`process_tracks`] runs them one after another;
//! with the `parallel` feature [`process_tracks_parallel`] spreads them over
//! the rayon pool. A failing track or leg is reported with its label and never
//! stops the rest of the batch.

use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, TrailError};
use crate::features::{extract_features, FeatureConfig, FeatureRecord};
use crate::interpolate::fill_gaps_detailed;
use crate::segmenter::{locate_boundaries, split_at_waypoint, split_forward, split_round_trip};
use crate::sequencer::{merge_waypoints, order};
use crate::spatial::IndexPolicy;
use crate::{Direction, Leg, TrackPoint, Waypoint};

/// How legs are derived from an ordered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Legs between consecutive waypoints, in recorded order
    Forward,
    /// Forward legs plus the mirrored return legs of an out-and-back trail
    RoundTrip,
}

/// Configuration for a processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Leg derivation mode.
    /// Default: Forward
    pub split_mode: SplitMode,

    /// Cut the raw track at the last waypoint into `route_a` (start to the
    /// last waypoint) and `route_b` (the last waypoint to the end), and
    /// process both.
    /// Default: false
    pub split_at_last_waypoint: bool,

    /// Interpolate interior elevation/time gaps before merging.
    /// Default: true
    pub fill_gaps: bool,

    pub index: IndexPolicy,
    pub features: FeatureConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            split_mode: SplitMode::Forward,
            split_at_last_waypoint: false,
            fill_gaps: true,
            index: IndexPolicy::default(),
            features: FeatureConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TrailError::ConfigError {
            message: e.to_string(),
        })
    }
}

/// One track to process, already parsed by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInput {
    pub track_id: String,
    pub points: Vec<TrackPoint>,
    pub waypoints: Vec<Waypoint>,
}

impl TrackInput {
    pub fn new(track_id: &str, points: Vec<TrackPoint>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            track_id: track_id.to_string(),
            points,
            waypoints,
        }
    }
}

/// Result for a single leg: features, or the reason they are missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegReport {
    pub sequence: u32,
    pub direction: Direction,
    pub start_label: String,
    pub end_label: String,
    pub point_count: usize,
    pub features: Option<FeatureRecord>,
    pub error: Option<String>,
    /// The leg's points, for the serialization layer
    pub points: Vec<TrackPoint>,
}

/// One processed route of a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteReport {
    /// `full`, or `route_a` / `route_b` when split at the last waypoint
    pub name: String,
    /// The ordered, merged track
    pub ordered: Vec<TrackPoint>,
    pub legs: Vec<LegReport>,
    /// Gaps that could not be filled
    pub unresolved_gaps: usize,
}

/// Everything produced for one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReport {
    pub track_id: String,
    pub routes: Vec<RouteReport>,
}

impl TrackReport {
    /// Render the report as JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TrailError::ConfigError {
            message: format!("report serialization failed: {}", e),
        })
    }

    /// Every leg across all routes.
    pub fn legs(&self) -> impl Iterator<Item = &LegReport> {
        self.routes.iter().flat_map(|r| r.legs.iter())
    }
}

/// Labeled outcome of one track in a batch.
#[derive(Debug, Clone)]
pub struct TrackOutcome {
    pub track_id: String,
    pub result: Result<TrackReport>,
}

/// Process one track.
pub fn process_track(input: &TrackInput, config: &PipelineConfig) -> Result<TrackReport> {
    validate(input)?;

    let bases: Vec<(String, Vec<TrackPoint>)> = if config.split_at_last_waypoint {
        // validate() guarantees at least two waypoints
        let last = &input.waypoints[input.waypoints.len() - 1];
        let (route_a, route_b) = split_at_waypoint(&input.points, last)?;
        vec![
            ("route_a".to_string(), route_a),
            ("route_b".to_string(), route_b),
        ]
    } else {
        vec![("full".to_string(), input.points.clone())]
    };

    let routes = bases
        .into_iter()
        .map(|(name, base)| process_route(&input.track_id, name, &base, &input.waypoints, config))
        .collect::<Result<Vec<_>>>()?;

    let leg_count: usize = routes.iter().map(|r| r.legs.len()).sum();
    info!(
        "[Pipeline] Track '{}': {} routes, {} legs",
        input.track_id,
        routes.len(),
        leg_count
    );

    Ok(TrackReport {
        track_id: input.track_id.clone(),
        routes,
    })
}

fn process_route(
    track_id: &str,
    name: String,
    base: &[TrackPoint],
    waypoints: &[Waypoint],
    config: &PipelineConfig,
) -> Result<RouteReport> {
    let (base, unresolved_gaps) = if config.fill_gaps {
        let (filled, stats) = fill_gaps_detailed(base);
        (filled, stats.unresolved.len())
    } else {
        (base.to_vec(), 0)
    };

    let merged = merge_waypoints(&base, waypoints, &config.index)?;
    let ordered = order(merged);
    let boundaries = locate_boundaries(&ordered, waypoints);

    let legs = match config.split_mode {
        SplitMode::Forward => split_forward(&ordered, &boundaries),
        SplitMode::RoundTrip => split_round_trip(&ordered, &boundaries),
    }
    .map_err(|e| e.with_track_id(track_id))?;

    let legs = legs
        .into_iter()
        .map(|leg| leg_report(track_id, &name, leg, &config.features))
        .collect();

    Ok(RouteReport {
        name,
        ordered,
        legs,
        unresolved_gaps,
    })
}

fn leg_report(track_id: &str, route: &str, leg: Leg, config: &FeatureConfig) -> LegReport {
    let (features, error) = match extract_features(&leg, config) {
        Ok(record) => (Some(record), None),
        Err(e) => {
            warn!(
                "[Pipeline] Track '{}' {} leg {} ({} -> {}) skipped: {}",
                track_id, route, leg.sequence, leg.start_label, leg.end_label, e
            );
            (None, Some(e.to_string()))
        }
    };

    LegReport {
        sequence: leg.sequence,
        direction: leg.direction,
        start_label: leg.start_label,
        end_label: leg.end_label,
        point_count: leg.points.len(),
        features,
        error,
        points: leg.points,
    }
}

/// Reject inputs no stage can work with.
fn validate(input: &TrackInput) -> Result<()> {
    let malformed = |message: String| TrailError::MalformedInput {
        track_id: input.track_id.clone(),
        message,
    };

    if let Some(i) = input.points.iter().position(|p| !p.position.is_valid()) {
        return Err(malformed(format!("track point {} has invalid coordinates", i)));
    }
    if let Some(w) = input.waypoints.iter().find(|w| !w.position.is_valid()) {
        return Err(malformed(format!(
            "waypoint '{}' has invalid coordinates",
            w.label
        )));
    }
    if let Some(i) = input
        .waypoints
        .iter()
        .position(|w| w.label.trim().is_empty())
    {
        return Err(malformed(format!("waypoint {} has no label", i)));
    }
    if input.points.len() < 2 {
        return Err(TrailError::InsufficientPoints {
            context: format!("Track '{}'", input.track_id),
            point_count: input.points.len(),
            minimum_required: 2,
        });
    }
    if input.waypoints.len() < 2 {
        return Err(TrailError::InsufficientBoundaries {
            context: format!("Track '{}'", input.track_id),
            boundary_count: input.waypoints.len(),
        });
    }
    Ok(())
}

/// Process a batch of tracks sequentially.
pub fn process_tracks(inputs: &[TrackInput], config: &PipelineConfig) -> Vec<TrackOutcome> {
    let outcomes: Vec<TrackOutcome> = inputs.iter().map(|i| outcome(i, config)).collect();
    log_batch(&outcomes);
    outcomes
}

/// Process a batch of tracks in parallel. Output order follows input order.
#[cfg(feature = "parallel")]
pub fn process_tracks_parallel(
    inputs: &[TrackInput],
    config: &PipelineConfig,
) -> Vec<TrackOutcome> {
    let outcomes: Vec<TrackOutcome> = inputs.par_iter().map(|i| outcome(i, config)).collect();
    log_batch(&outcomes);
    outcomes
}

fn outcome(input: &TrackInput, config: &PipelineConfig) -> TrackOutcome {
    let result = process_track(input, config);
    if let Err(e) = &result {
        warn!("[Pipeline] Track '{}' failed: {}", input.track_id, e);
    }
    TrackOutcome {
        track_id: input.track_id.clone(),
        result,
    }
}

fn log_batch(outcomes: &[TrackOutcome]) {
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        "[Pipeline] Processed {} tracks ({} failed)",
        outcomes.len(),
        failed
    );
}
