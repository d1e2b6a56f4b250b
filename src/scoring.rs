//! Candidate scoring.
//!
//! Rates one (agency stop, mapped feature) pair. Pure and deterministic:
//! identical inputs always give bit-identical ratings.
//!
//! ```text
//! base   = name_similarity / (1 + distance_m / 10)
//! rating = (base * (0.5 + 0.5 * platform)) ^ (1 - 0.3 * direction - 0.2 * (mode - 0.5))
//! ```
//!
//! Distance decays hyperbolically so GPS noise near a stop costs little
//! while clearly misplaced candidates fall off. Direction and mode act on
//! the exponent, so agreeing evidence lifts a rating towards 1 and
//! contradicting evidence pushes it towards 0.
//!
//! A feature whose external ref equals the stop id is rated exactly 1.
//! Heuristic ratings are scaled by `MAX_HEURISTIC_RATING` so that value
//! stays reserved and the rating still falls strictly with distance.

use crate::direction::direction_evidence;
use crate::names::name_similarity;
use crate::{AgencyStop, CandidateEdge, MappedFeature, MatchConfig, NameVariant, TransitMode};

pub const PLATFORM_EXACT: f64 = 1.0;
/// Untagged platforms are common and only weakly penalized.
pub const PLATFORM_BOTH_ABSENT: f64 = 0.9;
pub const PLATFORM_ONE_ABSENT: f64 = 0.85;
pub const PLATFORM_MISMATCH: f64 = 0.0;

pub const MODE_MATCH: f64 = 1.0;
pub const MODE_UNSERVED_STOP: f64 = 0.3;
pub const MODE_UNTAGGED_FEATURE: f64 = 0.5;
pub const MODE_MISMATCH: f64 = 0.0;
/// Mode score with a neutral effect on the rating exponent.
pub const MODE_BASELINE: f64 = 0.5;

pub const AUTHORITATIVE_RATING: f64 = 1.0;
pub const MAX_HEURISTIC_RATING: f64 = 1.0 - 1e-9;

const DISTANCE_SCALE_M: f64 = 10.0;
const DIRECTION_WEIGHT: f64 = 0.3;
const MODE_WEIGHT: f64 = 0.2;

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Agreement between the stop's platform code and the feature's assumed platform.
pub fn platform_score(stop_platform: Option<&str>, feature_platform: Option<&str>) -> f64 {
    match (present(stop_platform), present(feature_platform)) {
        (Some(a), Some(b)) if a == b => PLATFORM_EXACT,
        (Some(_), Some(_)) => PLATFORM_MISMATCH,
        (None, None) => PLATFORM_BOTH_ABSENT,
        _ => PLATFORM_ONE_ABSENT,
    }
}

/// Agreement between the stop's mode and the feature's mode tag.
pub fn mode_score(stop_mode: TransitMode, feature_mode: Option<TransitMode>) -> f64 {
    match (stop_mode, feature_mode) {
        (TransitMode::Unknown, _) => MODE_UNSERVED_STOP,
        (stop, Some(feature)) if stop == feature => MODE_MATCH,
        (stop, Some(TransitMode::Trainish)) if stop.is_rail_like() => MODE_MATCH,
        (_, None | Some(TransitMode::Unknown)) => MODE_UNTAGGED_FEATURE,
        _ => MODE_MISMATCH,
    }
}

/// True when the pair can never be the same physical stop: rail-bound
/// features for bus stops and bus features for rail stops.
pub fn modes_incompatible(stop_mode: TransitMode, feature_mode: Option<TransitMode>) -> bool {
    match feature_mode {
        Some(TransitMode::Bus) => stop_mode.is_rail_like(),
        Some(mode) if mode.is_rail_like() => stop_mode == TransitMode::Bus,
        _ => false,
    }
}

/// Best similarity between the feature name and either stop name.
///
/// When the feature or the stop has no name at all, the fixed
/// `missing_name_similarity` is used so a missing name neither wins nor
/// loses by default.
pub fn best_name_similarity(
    stop: &AgencyStop,
    feature_name: Option<&str>,
    config: &MatchConfig,
) -> (f64, NameVariant) {
    let Some(feature_name) = present(feature_name) else {
        return (config.missing_name_similarity, NameVariant::Substituted);
    };

    let short = present(stop.name_short.as_deref()).map(|n| name_similarity(n, feature_name));
    let long = present(stop.name_long.as_deref()).map(|n| name_similarity(n, feature_name));

    match (short, long) {
        (Some(s), Some(l)) if l > s => (l, NameVariant::Long),
        (Some(s), _) => (s, NameVariant::Short),
        (None, Some(l)) => (l, NameVariant::Long),
        (None, None) => (config.missing_name_similarity, NameVariant::Substituted),
    }
}

/// Composite rating from sub-scores, without the external-ref shortcut.
pub fn composite_rating(
    name_similarity: f64,
    distance_m: f64,
    platform_score: f64,
    mode_score: f64,
    direction_score: f64,
) -> f64 {
    let base = name_similarity / (1.0 + distance_m / DISTANCE_SCALE_M);
    let scaled = base * (0.5 + 0.5 * platform_score);
    let exponent =
        1.0 - DIRECTION_WEIGHT * direction_score - MODE_WEIGHT * (mode_score - MODE_BASELINE);
    scaled.powf(exponent) * MAX_HEURISTIC_RATING
}

/// Score one candidate pair.
///
/// # Example
/// ```
/// use stopmatch::{AgencyStop, FeatureKind, GeoPoint, MappedFeature, MatchConfig, rate_candidate};
///
/// let stop = AgencyStop::new("de:08111:2:1:1", "Rathaus", GeoPoint::new(48.0, 9.0));
/// let mut feature = MappedFeature::new("n1", Some("Rathaus"), GeoPoint::new(48.0, 9.0), FeatureKind::Stop);
/// feature.external_ref = Some("de:08111:2:1:1".to_string());
///
/// let edge = rate_candidate(&stop, &feature, 120.0, &MatchConfig::default());
/// assert_eq!(edge.rating, 1.0);
/// ```
pub fn rate_candidate(
    stop: &AgencyStop,
    feature: &MappedFeature,
    distance_m: f64,
    config: &MatchConfig,
) -> CandidateEdge {
    let (name_similarity, matched_name) =
        best_name_similarity(stop, feature.name.as_deref(), config);
    let platform = platform_score(
        stop.effective_platform().as_deref(),
        feature.assumed_platform.as_deref(),
    );
    let mode = mode_score(stop.mode, feature.mode);
    let direction = direction_evidence(stop, feature, config);

    // Duplicate external refs across features are not deduplicated here.
    let rating = if feature.external_ref.as_deref() == Some(stop.id.as_str()) {
        AUTHORITATIVE_RATING
    } else {
        composite_rating(name_similarity, distance_m, platform, mode, direction.score())
    };

    CandidateEdge {
        agency_id: stop.id.clone(),
        feature_id: feature.id.clone(),
        distance_m,
        name_similarity,
        matched_name,
        platform_score: platform,
        mode_score: mode,
        direction,
        rating,
    }
}
