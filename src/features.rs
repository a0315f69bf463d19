//! Per-leg distance, elevation and slope features.
//!
//! ## Features
//! - Horizontal distance (great-circle, or a supplied reference line)
//! - Elevation range, gain, loss and net change per kilometer
//! - Maximum slope (percent and degrees) with its location
//! - Slope spread (population standard deviation / variance, in degrees)
//! - Slope distribution over nine fixed degree bins
//!
//! ## Example
//! ```rust
//! use trail_segmenter::{extract_features, Direction, FeatureConfig, Leg, TrackPoint};
//!
//! let leg = Leg {
//!     sequence: 1,
//!     direction: Direction::Forward,
//!     start_label: "A".to_string(),
//!     end_label: "B".to_string(),
//!     points: vec![
//!         TrackPoint::measured(0.0, 0.0).with_elevation(0.0),
//!         TrackPoint::measured(0.0, 0.001).with_elevation(10.0),
//!     ],
//! };
//! let record = extract_features(&leg, &FeatureConfig::default()).unwrap();
//! assert_eq!(record.distance, 111.19);
//! assert_eq!(record.max_slope_degrees, 5.14);
//! ```

use std::collections::HashMap;

use geo::LineString;
use log::debug;
use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TrailError};
use crate::geo_utils::{haversine_distance, line_string_length, round_to, track_length};
use crate::{GpsPoint, Leg, PointOrigin, TrackPoint};

/// Where the leg distance comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    /// Every point of the leg
    Points,
    /// Only measured points (the recorded line), falling back to every point
    /// when fewer than two are measured
    MeasuredLine,
}

/// Configuration for feature extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Segments at most this long (meters) are left out of slope statistics.
    /// Default: 1.0
    pub min_slope_segment_m: f64,

    /// Elevation above which a leg is flagged as high (meters).
    /// Default: 2438.0 (common altitude-sickness threshold)
    pub high_elevation_threshold_m: f64,

    /// Distance source for `distance`.
    /// Default: Points
    pub distance_source: DistanceSource,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_slope_segment_m: 1.0,
            high_elevation_threshold_m: 2438.0,
            distance_source: DistanceSource::Points,
        }
    }
}

/// One of the nine slope bins, in degrees.
///
/// Bins are left-closed/right-open; the two outer bins are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeBin {
    SteepDown,
    HardDown,
    ModerateDown,
    GentleDown,
    Flat,
    GentleUp,
    ModerateUp,
    HardUp,
    SteepUp,
}

impl SlopeBin {
    pub const ALL: [SlopeBin; 9] = [
        SlopeBin::SteepDown,
        SlopeBin::HardDown,
        SlopeBin::ModerateDown,
        SlopeBin::GentleDown,
        SlopeBin::Flat,
        SlopeBin::GentleUp,
        SlopeBin::ModerateUp,
        SlopeBin::HardUp,
        SlopeBin::SteepUp,
    ];

    /// Bin containing a slope in degrees.
    pub fn for_degrees(degrees: f64) -> Self {
        if degrees < -15.0 {
            SlopeBin::SteepDown
        } else if degrees < -10.0 {
            SlopeBin::HardDown
        } else if degrees < -5.0 {
            SlopeBin::ModerateDown
        } else if degrees < -1.0 {
            SlopeBin::GentleDown
        } else if degrees < 1.0 {
            SlopeBin::Flat
        } else if degrees < 5.0 {
            SlopeBin::GentleUp
        } else if degrees < 10.0 {
            SlopeBin::ModerateUp
        } else if degrees < 15.0 {
            SlopeBin::HardUp
        } else {
            SlopeBin::SteepUp
        }
    }

    /// Position of this bin in [`SlopeBin::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            SlopeBin::SteepDown => "<-15°",
            SlopeBin::HardDown => "-15°~-10°",
            SlopeBin::ModerateDown => "-10°~-5°",
            SlopeBin::GentleDown => "-5°~-1°",
            SlopeBin::Flat => "-1°~1°",
            SlopeBin::GentleUp => "1°~5°",
            SlopeBin::ModerateUp => "5°~10°",
            SlopeBin::HardUp => "10°~15°",
            SlopeBin::SteepUp => ">15°",
        }
    }
}

/// Share of qualifying segments per slope bin, as percentages (0-100).
///
/// Serializes as a map keyed by bin label (`"<-15°"` ... `">15°"`), in bin
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlopeHistogram {
    /// Indexed in [`SlopeBin::ALL`] order
    pub percentages: [f64; 9],
}

impl SlopeHistogram {
    /// Build from slope angles in degrees. Empty input gives all zeros.
    pub fn from_degrees(slopes: &[f64]) -> Self {
        let mut counts = [0u32; 9];
        for &slope in slopes {
            counts[SlopeBin::for_degrees(slope).index()] += 1;
        }

        let mut percentages = [0.0f64; 9];
        if !slopes.is_empty() {
            let total = slopes.len() as f64;
            for (pct, &count) in percentages.iter_mut().zip(counts.iter()) {
                *pct = round_to(count as f64 / total * 100.0, 2);
            }
        }
        Self { percentages }
    }

    pub fn get(&self, bin: SlopeBin) -> f64 {
        self.percentages[bin.index()]
    }

    /// Bins with their labels, in order.
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        SlopeBin::ALL
            .iter()
            .map(move |&bin| (bin.label(), self.get(bin)))
    }

    pub fn total(&self) -> f64 {
        self.percentages.iter().sum()
    }
}

impl Serialize for SlopeHistogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SlopeBin::ALL.len()))?;
        for (label, pct) in self.labeled() {
            map.serialize_entry(label, &pct)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SlopeHistogram {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let by_label: HashMap<String, f64> = HashMap::deserialize(deserializer)?;
        let mut percentages = [0.0f64; 9];
        for bin in SlopeBin::ALL {
            percentages[bin.index()] = by_label
                .get(bin.label())
                .copied()
                .ok_or_else(|| de::Error::missing_field(bin.label()))?;
        }
        Ok(Self { percentages })
    }
}

/// Features of one leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Horizontal distance in meters (0.01)
    pub distance: f64,
    /// Max minus min elevation in meters (0.1)
    pub elevation_range: f64,
    /// Net elevation change per kilometer (0.01)
    pub elevation_change_rate: f64,
    /// Sum of positive elevation changes (0.1)
    pub elevation_gain: f64,
    /// Sum of absolute negative elevation changes (0.1)
    pub elevation_loss: f64,
    /// Max elevation above the configured threshold
    pub high_elevation: bool,
    /// Steepest qualifying segment, signed percent (0.01)
    pub max_slope_percent: f64,
    /// Steepest qualifying segment, signed degrees (0.01)
    pub max_slope_degrees: f64,
    /// End point of the steepest segment, None when no segment has a slope
    pub max_slope_point: Option<GpsPoint>,
    /// Population standard deviation of slope degrees (0.01)
    pub slope_std_dev: f64,
    /// Population variance of slope degrees (0.01)
    pub slope_variance: f64,
    pub slope_freq_dist: SlopeHistogram,
}

/// Compute the features of a leg.
///
/// Elevation and slope statistics use the points that carry an elevation; a
/// leg with fewer than two such points fails with `InsufficientPoints`.
pub fn extract_features(leg: &Leg, config: &FeatureConfig) -> Result<FeatureRecord> {
    require_points(leg)?;

    let distance = match config.distance_source {
        DistanceSource::Points => track_length(&leg.points),
        DistanceSource::MeasuredLine => {
            let measured: Vec<TrackPoint> = leg
                .points
                .iter()
                .filter(|p| p.origin == PointOrigin::Measured)
                .cloned()
                .collect();
            if measured.len() >= 2 {
                track_length(&measured)
            } else {
                track_length(&leg.points)
            }
        }
    };

    compute_record(leg, distance, config)
}

/// Compute the features of a leg, taking the distance from a reference line
/// covering the same span.
pub fn extract_features_with_reference(
    leg: &Leg,
    reference: &LineString<f64>,
    config: &FeatureConfig,
) -> Result<FeatureRecord> {
    require_points(leg)?;
    compute_record(leg, line_string_length(reference), config)
}

fn require_points(leg: &Leg) -> Result<()> {
    if leg.points.len() < 2 {
        return Err(TrailError::InsufficientPoints {
            context: format!("Leg {}", leg.sequence),
            point_count: leg.points.len(),
            minimum_required: 2,
        });
    }
    Ok(())
}

/// Steepest segment seen so far.
struct MaxSlope {
    percent: f64,
    degrees: f64,
    point: Option<GpsPoint>,
}

fn compute_record(leg: &Leg, distance: f64, config: &FeatureConfig) -> Result<FeatureRecord> {
    let profile: Vec<(GpsPoint, f64)> = leg
        .points
        .iter()
        .filter_map(|p| p.elevation.map(|e| (p.position, e)))
        .collect();

    if profile.len() < 2 {
        return Err(TrailError::InsufficientPoints {
            context: format!("Leg {} elevation profile", leg.sequence),
            point_count: profile.len(),
            minimum_required: 2,
        });
    }

    let (min_elevation, max_elevation) = profile
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, e)| {
            (lo.min(e), hi.max(e))
        });

    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut slopes_degrees: Vec<f64> = Vec::with_capacity(profile.len() - 1);
    let mut steepest = MaxSlope {
        percent: 0.0,
        degrees: 0.0,
        point: None,
    };

    for w in profile.windows(2) {
        let (from, from_elevation) = w[0];
        let (to, to_elevation) = w[1];

        let change = to_elevation - from_elevation;
        if change > 0.0 {
            gain += change;
        } else {
            loss += change.abs();
        }

        let segment = haversine_distance(&from, &to);
        if segment <= config.min_slope_segment_m {
            continue;
        }

        let percent = change / segment * 100.0;
        let degrees = (percent / 100.0).atan().to_degrees();
        slopes_degrees.push(degrees);

        // Strict comparison: the first of equally steep segments wins
        if percent.abs() > steepest.percent.abs() {
            steepest = MaxSlope {
                percent,
                degrees,
                point: Some(to),
            };
        }
    }

    let elevation_change_rate = if distance > 0.0 {
        (gain - loss) / distance * 1000.0
    } else {
        0.0
    };

    let (slope_std_dev, slope_variance) = population_spread(&slopes_degrees);

    debug!(
        "[Features] Leg {} ({} -> {}): {:.1}m, +{:.1}/-{:.1}m, {} slope segments",
        leg.sequence,
        leg.start_label,
        leg.end_label,
        distance,
        gain,
        loss,
        slopes_degrees.len()
    );

    Ok(FeatureRecord {
        distance: round_to(distance, 2),
        elevation_range: round_to(max_elevation - min_elevation, 1),
        elevation_change_rate: round_to(elevation_change_rate, 2),
        elevation_gain: round_to(gain, 1),
        elevation_loss: round_to(loss, 1),
        high_elevation: max_elevation > config.high_elevation_threshold_m,
        max_slope_percent: round_to(steepest.percent, 2),
        max_slope_degrees: round_to(steepest.degrees, 2),
        max_slope_point: steepest.point,
        slope_std_dev: round_to(slope_std_dev, 2),
        slope_variance: round_to(slope_variance, 2),
        slope_freq_dist: SlopeHistogram::from_degrees(&slopes_degrees),
    })
}

/// Population standard deviation and variance; zeros for empty input.
fn population_spread(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (variance.sqrt(), variance)
}
