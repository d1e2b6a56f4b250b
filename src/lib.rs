//! # Stop Matcher
//!
//! Reconciles an official stop registry (GTFS, regional or national stop
//! directories) with community-mapped stop features, producing a best-effort
//! one-to-one correspondence between agency stop ids and mapped feature ids.
//!
//! This library provides:
//! - An R-tree feature index for nearest-neighbour candidate lookup
//! - A deterministic candidate scorer (name, platform, mode, direction, distance)
//! - Candidate generation with hard filters and noise pruning
//! - Optimal one-to-one assignment per stop area (bounded exhaustive search)
//! - Global conflict resolution yielding an injective match set
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel candidate generation and group solving with rayon
//! - **`synthetic`** - Seeded synthetic datasets for stress testing
//!
//! ## Quick Start
//!
//! ```rust
//! use stopmatch::{AgencyStop, FeatureKind, GeoPoint, MappedFeature, MatchConfig, StopMatcher};
//!
//! let stop = AgencyStop::new("de:08111:6015:0:3", "Pestalozzischule", GeoPoint::new(48.7258, 9.1133));
//! let feature = MappedFeature::new(
//!     "n271653920",
//!     Some("Pestalozzischule"),
//!     GeoPoint::new(48.7259, 9.1134),
//!     FeatureKind::Platform,
//! );
//!
//! let matcher = StopMatcher::new(vec![feature], MatchConfig::default()).unwrap();
//! let outcome = matcher.run(&[stop]).unwrap();
//! assert!(outcome.is_stop_matched("de:08111:6015:0:3"));
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, StopMatchError};

// Geographic utilities (distance, unit-sphere projection)
pub mod geo_utils;

// Name normalization and n-gram similarity
pub mod names;
pub use names::{NameVariant, name_similarity};

// Direction marker extraction and successor agreement
pub mod direction;
pub use direction::{DirectionEvidence, direction_evidence};

// Candidate scoring
pub mod scoring;
pub use scoring::{mode_score, platform_score, rate_candidate};

// Parent-area grouping and degradation safeguards
pub mod grouping;
pub use grouping::{CandidateGroup, group_candidates, parent_area_key};

// Matching pipeline: index, generation, assignment, conflict resolution
pub mod engine;
pub use engine::{
    AssignmentOutcome, FeatureIndex, MatchDiagnostics, MatchOutcome, StopMatcher,
    generate_candidates, resolve_conflicts, solve_group,
};

// Regression expectations over a match outcome
pub mod validation;
pub use validation::{MatchExpectation, ValidationFailure, validate_outcome};

// Seeded synthetic datasets for benchmarks
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate.
///
/// # Example
/// ```
/// use stopmatch::GeoPoint;
/// let point = GeoPoint::new(48.7758, 9.1829); // Stuttgart
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
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

/// Transport mode of a stop or mapped feature.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransitMode {
    Bus,
    Tram,
    Train,
    LightRail,
    Ferry,
    Funicular,
    /// Some rail-like mode that the map tags do not disambiguate.
    /// Only produced for mapped features.
    Trainish,
    /// No declared mode. For agency stops this usually means the stop is unserved.
    #[default]
    Unknown,
}

impl TransitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitMode::Bus => "bus",
            TransitMode::Tram => "tram",
            TransitMode::Train => "train",
            TransitMode::LightRail => "light_rail",
            TransitMode::Ferry => "ferry",
            TransitMode::Funicular => "funicular",
            TransitMode::Trainish => "trainish",
            TransitMode::Unknown => "unknown",
        }
    }

    /// Rail-bound modes, including the undisambiguated placeholder.
    pub fn is_rail_like(&self) -> bool {
        matches!(
            self,
            TransitMode::Tram
                | TransitMode::Train
                | TransitMode::LightRail
                | TransitMode::Funicular
                | TransitMode::Trainish
        )
    }
}

impl std::fmt::Display for TransitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransitMode {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bus" => Ok(TransitMode::Bus),
            "tram" => Ok(TransitMode::Tram),
            "train" | "rail" => Ok(TransitMode::Train),
            "light_rail" => Ok(TransitMode::LightRail),
            "ferry" => Ok(TransitMode::Ferry),
            "funicular" => Ok(TransitMode::Funicular),
            "trainish" => Ok(TransitMode::Trainish),
            _ => Ok(TransitMode::Unknown),
        }
    }
}

/// How a mapped feature is tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Station,
    Halt,
    Stop,
    Platform,
}

/// One official stop, platform or quay from the agency registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyStop {
    /// Hierarchical id (`country:region:parent:...:quay`), unique and immutable
    pub id: String,
    /// Enclosing stop area, when the record is a quay
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name_short: Option<String>,
    #[serde(default)]
    pub name_long: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    /// Unlocated stops are excluded from matching
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub mode: TransitMode,
    #[serde(default)]
    pub platform_code: Option<String>,
    /// Free text, often "Ri <destination>"
    #[serde(default)]
    pub direction_hint: Option<String>,
    /// Empty or absent suggests the stop may be unserved
    #[serde(default)]
    pub served_routes: Option<Vec<String>>,
}

impl AgencyStop {
    /// Create a located stop with a single name and no further attributes.
    pub fn new(id: &str, name: &str, location: GeoPoint) -> Self {
        Self {
            id: id.to_string(),
            parent_id: None,
            name_short: Some(name.to_string()),
            name_long: Some(name.to_string()),
            locality: None,
            municipality: None,
            location: Some(location),
            mode: TransitMode::Unknown,
            platform_code: None,
            direction_hint: None,
            served_routes: None,
        }
    }

    /// Location, if present and valid.
    pub fn located(&self) -> Option<GeoPoint> {
        self.location.filter(|p| p.is_valid())
    }

    /// Platform code, falling back to the digits of the last id segment
    /// for ids with more than three segments (`de:08111:6015:0:3` -> `3`,
    /// `de:08111:6015:4` -> `4`).
    pub fn effective_platform(&self) -> Option<String> {
        if let Some(code) = self.platform_code.as_deref().map(str::trim) {
            if !code.is_empty() {
                return Some(code.to_string());
            }
        }
        if self.id.matches(':').count() <= 2 {
            return None;
        }
        let last = self.id.rsplit(':').next()?;
        let digits: String = last.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() { None } else { Some(digits) }
    }

    /// True when no name field carries text.
    pub fn has_no_name(&self) -> bool {
        is_blank(&self.name_short) && is_blank(&self.name_long)
    }
}

/// One candidate location from the community map catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedFeature {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `None` when the map carries no mode tag
    #[serde(default)]
    pub mode: Option<TransitMode>,
    pub location: GeoPoint,
    pub kind: FeatureKind,
    /// Foreign id copied from map tags; authoritative when equal to an agency id
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub assumed_platform: Option<String>,
    /// Slash-joined names of route successors
    #[serde(default)]
    pub next_names: Option<String>,
    /// Slash-joined names of route predecessors
    #[serde(default)]
    pub prev_names: Option<String>,
}

impl MappedFeature {
    pub fn new(id: &str, name: Option<&str>, location: GeoPoint, kind: FeatureKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            mode: None,
            location,
            kind,
            external_ref: None,
            assumed_platform: None,
            next_names: None,
            prev_names: None,
        }
    }
}

/// A scored (agency stop, mapped feature) pair.
///
/// Created once by candidate generation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEdge {
    pub agency_id: String,
    pub feature_id: String,
    /// Haversine distance in meters
    pub distance_m: f64,
    /// Name similarity in [0, 1]
    pub name_similarity: f64,
    /// Which stop name produced `name_similarity`
    pub matched_name: NameVariant,
    /// One of 0.0, 0.85, 0.9, 1.0
    pub platform_score: f64,
    /// Mode agreement in [0, 1]
    pub mode_score: f64,
    pub direction: DirectionEvidence,
    /// Composite rating; exactly 1.0 only for an authoritative external ref
    pub rating: f64,
}

impl CandidateEdge {
    pub fn direction_score(&self) -> f64 {
        self.direction.score()
    }
}

/// An accepted pairing. At most one per agency id and one per feature id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub agency_id: String,
    pub feature_id: String,
    pub rating: f64,
    pub distance_m: f64,
    pub name_similarity: f64,
    pub matched_name: NameVariant,
    pub platform_score: f64,
    pub mode_score: f64,
    pub direction: DirectionEvidence,
}

impl From<&CandidateEdge> for Match {
    fn from(edge: &CandidateEdge) -> Self {
        Self {
            agency_id: edge.agency_id.clone(),
            feature_id: edge.feature_id.clone(),
            rating: edge.rating,
            distance_m: edge.distance_m,
            name_similarity: edge.name_similarity,
            matched_name: edge.matched_name,
            platform_score: edge.platform_score,
            mode_score: edge.mode_score,
            direction: edge.direction,
        }
    }
}

/// Configuration for candidate generation and assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Candidates farther than this are never considered.
    /// Default: 400.0 meters
    pub max_distance_m: f64,

    /// Nearest features fetched per ordinary stop.
    /// Default: 10
    pub nearest_count: usize,

    /// Nearest features fetched per hub (stations, terminals, airports).
    /// Default: 15
    pub hub_nearest_count: usize,

    /// Candidates rated below this are discarded as noise.
    /// Default: 0.001
    pub min_rating: f64,

    /// Name similarity used when the stop or the feature has no name.
    /// Default: 0.3
    pub missing_name_similarity: f64,

    /// A farther candidate is dropped when an earlier one beat its name
    /// similarity by more than this margin...
    /// Default: 0.1
    pub name_margin: f64,

    /// ...and its own name similarity is below this.
    /// Default: 0.3
    pub low_name_similarity: f64,

    /// Minimum similarity between destination and neighbour names to count
    /// as direction evidence.
    /// Default: 0.7
    pub direction_min_similarity: f64,

    /// Minimum lead of next over prev similarity (or vice versa).
    /// Default: 0.15
    pub direction_min_margin: f64,

    /// Score an unmatched stop contributes to its group. Edges rated at or
    /// below this are never assigned.
    /// Default: 0.0032
    pub unmatched_baseline: f64,

    /// Above this many candidate edges a group keeps only the best edge per feature.
    /// Default: 50
    pub max_group_candidates: usize,

    /// Above this many agency stops a group is split by the coarser key.
    /// Default: 10
    pub max_group_stops: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_distance_m: 400.0,
            nearest_count: 10,
            hub_nearest_count: 15,
            min_rating: 0.001,
            missing_name_similarity: 0.3,
            name_margin: 0.1,
            low_name_similarity: 0.3,
            direction_min_similarity: 0.7,
            direction_min_margin: 0.15,
            unmatched_baseline: 0.0032,
            max_group_candidates: 50,
            max_group_stops: 10,
        }
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}
