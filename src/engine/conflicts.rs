//! Global conflict resolution across groups.
//!
//! Groups are solved independently, so two groups can claim the same
//! feature, and a split group can assign one agency stop in two places.
//! Resolution runs two passes over the group winners:
//! 1. per feature, keep the highest rating (then name similarity, then
//!    the smaller agency id)
//! 2. per agency stop, keep the highest rating (then name similarity, then
//!    the smaller feature id)
//!
//! The result is injective on both sides.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::debug;

use crate::{CandidateEdge, Match};

/// Counts of edges dropped by each pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictStats {
    pub feature_conflicts: usize,
    pub agency_duplicates: usize,
}

fn feature_preference(a: &CandidateEdge, b: &CandidateEdge) -> Ordering {
    a.rating
        .total_cmp(&b.rating)
        .then_with(|| a.name_similarity.total_cmp(&b.name_similarity))
        .then_with(|| b.agency_id.cmp(&a.agency_id))
}

fn agency_preference(a: &CandidateEdge, b: &CandidateEdge) -> Ordering {
    a.rating
        .total_cmp(&b.rating)
        .then_with(|| a.name_similarity.total_cmp(&b.name_similarity))
        .then_with(|| b.feature_id.cmp(&a.feature_id))
}

/// Keep the preferred edge per key. `prefer(a, b) == Greater` means `a` wins.
fn keep_best<'a, K, F>(
    edges: impl IntoIterator<Item = &'a CandidateEdge>,
    key: K,
    prefer: F,
) -> (Vec<&'a CandidateEdge>, usize)
where
    K: Fn(&CandidateEdge) -> &str,
    F: Fn(&CandidateEdge, &CandidateEdge) -> Ordering,
{
    let mut best: BTreeMap<&str, &CandidateEdge> = BTreeMap::new();
    let mut dropped = 0;
    for edge in edges {
        match best.get_mut(key(edge)) {
            Some(current) => {
                dropped += 1;
                if prefer(edge, *current).is_gt() {
                    debug!(
                        "[Conflicts] {} -> {} replaces {} -> {}",
                        edge.agency_id, edge.feature_id, current.agency_id, current.feature_id
                    );
                    *current = edge;
                }
            }
            None => {
                best.insert(key(edge), edge);
            }
        }
    }
    (best.into_values().collect(), dropped)
}

/// Reduce group winners to an injective match set, sorted by agency id.
pub fn resolve_conflicts(winners: &[CandidateEdge]) -> (Vec<Match>, ConflictStats) {
    let (per_feature, feature_conflicts) =
        keep_best(winners, |e| e.feature_id.as_str(), feature_preference);
    let (per_agency, agency_duplicates) =
        keep_best(per_feature, |e| e.agency_id.as_str(), agency_preference);

    let matches = per_agency.into_iter().map(Match::from).collect();
    (
        matches,
        ConflictStats {
            feature_conflicts,
            agency_duplicates,
        },
    )
}
