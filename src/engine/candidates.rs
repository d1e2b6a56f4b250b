//! Candidate generation.
//!
//! For each located agency stop, walks the nearest mapped features in
//! distance order and emits rated candidate edges:
//! - stop at the first feature beyond `max_distance_m`
//! - skip features whose mode can never match the stop
//! - skip edges rated below `min_rating`
//! - skip a farther feature whose name is clearly worse than a nearer
//!   accepted one and poor in absolute terms
//!
//! Generation returns an explicit edge list and touches no shared state.

use log::debug;

use super::FeatureIndex;
use crate::names::is_hub_name;
use crate::scoring::{AUTHORITATIVE_RATING, modes_incompatible, rate_candidate};
use crate::{AgencyStop, CandidateEdge, MatchConfig};

/// Number of nearest features to examine for a stop.
pub fn neighbour_count(stop: &AgencyStop, config: &MatchConfig) -> usize {
    let hub = [&stop.name_short, &stop.name_long]
        .into_iter()
        .flatten()
        .any(|name| is_hub_name(name));
    if hub {
        config.hub_nearest_count
    } else {
        config.nearest_count
    }
}

/// Candidate edges for one stop, nearest feature first.
///
/// Unlocated stops yield no candidates.
pub fn generate_candidates(
    stop: &AgencyStop,
    index: &FeatureIndex,
    config: &MatchConfig,
) -> Vec<CandidateEdge> {
    let Some(location) = stop.located() else {
        return Vec::new();
    };

    let mut edges: Vec<CandidateEdge> = Vec::new();
    let mut best_name_similarity: Option<f64> = None;

    for (feature, distance_m) in index.nearest(&location, neighbour_count(stop, config)) {
        if distance_m > config.max_distance_m {
            break;
        }
        if modes_incompatible(stop.mode, feature.mode) {
            continue;
        }

        let edge = rate_candidate(stop, feature, distance_m, config);
        if edge.rating < config.min_rating {
            continue;
        }

        if edge.rating < AUTHORITATIVE_RATING {
            if let Some(best) = best_name_similarity {
                if best - edge.name_similarity > config.name_margin
                    && edge.name_similarity < config.low_name_similarity
                {
                    debug!(
                        "[Candidates] {} -> {}: name {:.3} trails nearer {:.3}, skipped",
                        stop.id, feature.id, edge.name_similarity, best
                    );
                    continue;
                }
            }
        }

        best_name_similarity = Some(
            best_name_similarity.map_or(edge.name_similarity, |b| b.max(edge.name_similarity)),
        );
        debug!(
            "[Candidates] {} -> {}: rating {:.4} at {:.0}m",
            stop.id, feature.id, edge.rating, distance_m
        );
        edges.push(edge);
    }

    edges
}

/// Candidate edges for all stops, in stop order.
#[cfg(feature = "parallel")]
pub fn generate_all(
    stops: &[AgencyStop],
    index: &FeatureIndex,
    config: &MatchConfig,
) -> Vec<Vec<CandidateEdge>> {
    use rayon::prelude::*;

    stops
        .par_iter()
        .map(|stop| generate_candidates(stop, index, config))
        .collect()
}

/// Candidate edges for all stops, in stop order.
#[cfg(not(feature = "parallel"))]
pub fn generate_all(
    stops: &[AgencyStop],
    index: &FeatureIndex,
    config: &MatchConfig,
) -> Vec<Vec<CandidateEdge>> {
    stops
        .iter()
        .map(|stop| generate_candidates(stop, index, config))
        .collect()
}
