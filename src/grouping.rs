//! Parent-area grouping of candidate edges.
//!
//! Quays of one physical stop compete for the same mapped platforms, so
//! their candidates are solved jointly. Grouping is a pure group-by over
//! the candidate list, keyed by a coarsening of the agency stop id.
//!
//! Two safeguards keep the exhaustive assignment search tractable:
//! 1. Groups with too many edges keep only the best edge per feature.
//! 2. Groups with too many stops are split by a coarser key (the stop id
//!    without its last segment). Sub-groups are solved independently, so
//!    the result is only optimal within each sub-group.

use std::collections::{BTreeMap, HashMap};

use log::warn;

use crate::error::{OptionExt, Result};
use crate::{CandidateEdge, MatchConfig};

/// Candidate edges of all agency stops sharing a parent-area key.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGroup {
    pub key: String,
    /// Agency id -> its edges, best first.
    pub candidates: BTreeMap<String, Vec<CandidateEdge>>,
}

impl CandidateGroup {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            candidates: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, edge: CandidateEdge) {
        self.candidates
            .entry(edge.agency_id.clone())
            .or_default()
            .push(edge);
    }

    pub fn stop_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn edge_count(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }

    fn sort_edges(&mut self) {
        for edges in self.candidates.values_mut() {
            edges.sort_by(compare_edges);
        }
    }
}

/// Best first: higher rating, then higher name similarity, then ids.
pub fn compare_edges(a: &CandidateEdge, b: &CandidateEdge) -> std::cmp::Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| b.name_similarity.total_cmp(&a.name_similarity))
        .then_with(|| a.feature_id.cmp(&b.feature_id))
        .then_with(|| a.agency_id.cmp(&b.agency_id))
}

/// Grouping key for an agency stop.
///
/// Hierarchical ids use their first three segments
/// (`de:08111:6015:0:3` -> `de:08111:6015`); shorter hierarchical ids are
/// their own key. Flat ids (GTFS `stop_id`s) fall back to the parent id.
///
/// # Example
/// ```
/// use stopmatch::parent_area_key;
/// assert_eq!(parent_area_key("de:08111:6015:0:3", None), "de:08111:6015");
/// assert_eq!(parent_area_key("de:08111:6015", None), "de:08111:6015");
/// assert_eq!(parent_area_key("4711", Some("place_99")), "place_99");
/// ```
pub fn parent_area_key(id: &str, parent_id: Option<&str>) -> String {
    if !id.contains(':') {
        return parent_id.unwrap_or(id).to_string();
    }
    match id.match_indices(':').nth(2) {
        Some((pos, _)) => id[..pos].to_string(),
        None => id.to_string(),
    }
}

/// Coarser split key: the id without its last segment.
pub fn split_key(id: &str) -> &str {
    id.rfind(':').map_or(id, |pos| &id[..pos])
}

/// Group edges by the parent-area key of their agency stop.
///
/// `area_keys` maps every agency id of the run to its key; an edge for an
/// agency id missing from it is an upstream contract breach.
pub fn group_candidates(
    edges: &[CandidateEdge],
    area_keys: &HashMap<String, String>,
) -> Result<Vec<CandidateGroup>> {
    let mut groups: BTreeMap<&str, CandidateGroup> = BTreeMap::new();
    for edge in edges {
        let key = area_keys
            .get(&edge.agency_id)
            .ok_or_unknown_stop(&edge.agency_id)?;
        groups
            .entry(key.as_str())
            .or_insert_with(|| CandidateGroup::new(key))
            .push(edge.clone());
    }

    Ok(groups
        .into_values()
        .map(|mut group| {
            group.sort_edges();
            group
        })
        .collect())
}

/// Keep only the best-rated edge per mapped feature.
pub fn collapse_to_best_per_feature(group: &CandidateGroup) -> CandidateGroup {
    let mut best: HashMap<&str, &CandidateEdge> = HashMap::new();
    for edge in group.candidates.values().flatten() {
        best.entry(edge.feature_id.as_str())
            .and_modify(|current| {
                if compare_edges(edge, *current).is_lt() {
                    *current = edge;
                }
            })
            .or_insert(edge);
    }

    let mut collapsed = CandidateGroup::new(&group.key);
    for edge in group.candidates.values().flatten() {
        if best
            .get(edge.feature_id.as_str())
            .is_some_and(|b| std::ptr::eq(*b, edge))
        {
            collapsed.push(edge.clone());
        }
    }
    collapsed.sort_edges();
    collapsed
}

/// Split a group by the coarser key of each agency stop.
pub fn split_group(group: &CandidateGroup) -> Vec<CandidateGroup> {
    let mut parts: BTreeMap<&str, CandidateGroup> = BTreeMap::new();
    for (agency_id, edges) in &group.candidates {
        let key = split_key(agency_id);
        let part = parts
            .entry(key)
            .or_insert_with(|| CandidateGroup::new(key));
        part.candidates.insert(agency_id.clone(), edges.clone());
    }
    parts.into_values().collect()
}

/// Which safeguards fired for a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degradation {
    pub collapsed: bool,
    pub split: bool,
}

/// Apply the size safeguards, returning the group(s) to solve.
pub fn prepare_group(
    group: CandidateGroup,
    config: &MatchConfig,
) -> (Vec<CandidateGroup>, Degradation) {
    let mut degradation = Degradation::default();

    let group = if group.edge_count() > config.max_group_candidates {
        warn!(
            "[Grouping] {} has {} candidates, keeping best edge per feature",
            group.key,
            group.edge_count()
        );
        degradation.collapsed = true;
        collapse_to_best_per_feature(&group)
    } else {
        group
    };

    if group.stop_count() > config.max_group_stops {
        let parts = split_group(&group);
        warn!(
            "[Grouping] {} has {} stops, solving {} sub-groups independently",
            group.key,
            group.stop_count(),
            parts.len()
        );
        degradation.split = true;
        return (parts, degradation);
    }

    (vec![group], degradation)
}
