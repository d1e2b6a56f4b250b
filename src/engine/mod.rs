//! # Matching Engine
//!
//! Runs the reconciliation pipeline over one agency catalog and one mapped
//! feature catalog:
//!
//! 1. `FeatureIndex` - R-tree over mapped features, built once per run
//! 2. `generate_candidates` - rated edges per located agency stop
//! 3. `group_candidates` / `prepare_group` - parent-area groups, bounded in size
//! 4. `solve_group` - optimal one-to-one assignment per group
//! 5. `resolve_conflicts` - injective match set across groups
//!
//! Candidate generation and group solving are data-parallel with the
//! `parallel` feature. Every stage consumes the previous stage's output
//! and nothing is mutated in place, so results do not depend on
//! scheduling.

pub mod assignment;
pub mod candidates;
pub mod conflicts;
pub mod feature_index;

pub use assignment::{AssignmentOutcome, solve_group};
pub use candidates::{generate_all, generate_candidates};
pub use conflicts::{ConflictStats, resolve_conflicts};
pub use feature_index::FeatureIndex;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, RecordKind, Result, StopMatchError};
use crate::grouping::{CandidateGroup, group_candidates, parent_area_key, prepare_group};
use crate::{AgencyStop, CandidateEdge, MappedFeature, Match, MatchConfig};

/// Counters describing how a run degraded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDiagnostics {
    pub stops_total: usize,
    pub stops_unlocated: usize,
    pub stops_without_name: usize,
    pub stops_with_candidates: usize,
    /// Located stops for which no candidate survived the filters.
    pub unmatched_without_candidates: Vec<String>,
    pub features_total: usize,
    pub features_skipped: usize,
    pub candidate_count: usize,
    pub group_count: usize,
    pub groups_collapsed: usize,
    pub groups_split: usize,
    pub feature_conflicts_dropped: usize,
    pub agency_duplicates_dropped: usize,
    pub matched_stops: usize,
    pub unmatched_stops: usize,
}

/// Result of one run: all candidates, the accepted matches and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub candidates: Vec<CandidateEdge>,
    /// Injective match set, sorted by agency id.
    pub matches: Vec<Match>,
    /// Per-group solver results, in group key order.
    pub assignments: Vec<AssignmentOutcome>,
    pub diagnostics: MatchDiagnostics,
    by_agency: HashMap<String, usize>,
    by_feature: HashMap<String, usize>,
}

impl MatchOutcome {
    pub fn new(
        candidates: Vec<CandidateEdge>,
        matches: Vec<Match>,
        assignments: Vec<AssignmentOutcome>,
        diagnostics: MatchDiagnostics,
    ) -> Self {
        let by_agency = matches
            .iter()
            .enumerate()
            .map(|(i, m)| (m.agency_id.clone(), i))
            .collect();
        let by_feature = matches
            .iter()
            .enumerate()
            .map(|(i, m)| (m.feature_id.clone(), i))
            .collect();
        Self {
            candidates,
            matches,
            assignments,
            diagnostics,
            by_agency,
            by_feature,
        }
    }

    /// Outcome holding only a match set, e.g. one loaded from disk.
    pub fn from_matches(matches: Vec<Match>) -> Self {
        Self::new(Vec::new(), matches, Vec::new(), MatchDiagnostics::default())
    }

    pub fn is_stop_matched(&self, agency_id: &str) -> bool {
        self.by_agency.contains_key(agency_id)
    }

    pub fn is_feature_matched(&self, feature_id: &str) -> bool {
        self.by_feature.contains_key(feature_id)
    }

    pub fn match_for_stop(&self, agency_id: &str) -> Option<&Match> {
        self.by_agency.get(agency_id).map(|&i| &self.matches[i])
    }

    pub fn match_for_feature(&self, feature_id: &str) -> Option<&Match> {
        self.by_feature.get(feature_id).map(|&i| &self.matches[i])
    }

    /// Candidates generated for one agency stop.
    pub fn candidates_for_stop<'a>(
        &'a self,
        agency_id: &'a str,
    ) -> impl Iterator<Item = &'a CandidateEdge> + 'a {
        self.candidates
            .iter()
            .filter(move |e| e.agency_id == agency_id)
    }
}

/// Matcher over a fixed mapped feature catalog.
///
/// The index is built once; `run` may be called repeatedly with different
/// agency catalogs.
#[derive(Debug)]
pub struct StopMatcher {
    index: FeatureIndex,
    config: MatchConfig,
}

impl StopMatcher {
    pub fn new(features: Vec<MappedFeature>, config: MatchConfig) -> Result<Self> {
        let start = Instant::now();
        let index = FeatureIndex::new(features)?;
        info!(
            "[StopMatcher] Indexed {} features in {}ms",
            index.len(),
            start.elapsed().as_millis()
        );
        Ok(Self { index, config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn index(&self) -> &FeatureIndex {
        &self.index
    }

    /// Generate candidates for all stops and assign them.
    pub fn run(&self, stops: &[AgencyStop]) -> Result<MatchOutcome> {
        let area_keys = check_stops(stops)?;

        let start = Instant::now();
        let candidates: Vec<CandidateEdge> = generate_all(stops, &self.index, &self.config)
            .into_iter()
            .flatten()
            .collect();
        info!(
            "[StopMatcher] Generated {} candidates for {} stops in {}ms",
            candidates.len(),
            stops.len(),
            start.elapsed().as_millis()
        );

        self.assign_checked(stops, &area_keys, candidates)
    }

    /// Assign precomputed candidates, e.g. ones loaded from an earlier run.
    ///
    /// Every edge must reference a stop in `stops` and a feature in the index.
    pub fn assign(
        &self,
        stops: &[AgencyStop],
        candidates: Vec<CandidateEdge>,
    ) -> Result<MatchOutcome> {
        let area_keys = check_stops(stops)?;
        self.assign_checked(stops, &area_keys, candidates)
    }

    fn assign_checked(
        &self,
        stops: &[AgencyStop],
        area_keys: &HashMap<String, String>,
        candidates: Vec<CandidateEdge>,
    ) -> Result<MatchOutcome> {
        let start = Instant::now();
        for edge in &candidates {
            self.index
                .get(&edge.feature_id)
                .ok_or_unknown_feature(&edge.agency_id, &edge.feature_id)?;
        }

        let mut diagnostics = self.stop_diagnostics(stops, &candidates);

        let mut prepared: Vec<CandidateGroup> = Vec::new();
        for group in group_candidates(&candidates, area_keys)? {
            let (parts, degradation) = prepare_group(group, &self.config);
            diagnostics.groups_collapsed += usize::from(degradation.collapsed);
            diagnostics.groups_split += usize::from(degradation.split);
            prepared.extend(parts);
        }
        diagnostics.group_count = prepared.len();

        let assignments = solve_all(&prepared, &self.config);
        let winners: Vec<CandidateEdge> = assignments
            .iter()
            .flat_map(|a| a.edges.iter().cloned())
            .collect();

        let (matches, stats) = resolve_conflicts(&winners);
        diagnostics.feature_conflicts_dropped = stats.feature_conflicts;
        diagnostics.agency_duplicates_dropped = stats.agency_duplicates;
        diagnostics.matched_stops = matches.len();
        diagnostics.unmatched_stops = stops.len() - matches.len();

        if diagnostics.groups_collapsed + diagnostics.groups_split > 0 {
            warn!(
                "[StopMatcher] {} groups collapsed, {} split; results there are approximate",
                diagnostics.groups_collapsed, diagnostics.groups_split
            );
        }
        info!(
            "[StopMatcher] Matched {}/{} stops in {} groups ({}ms)",
            matches.len(),
            stops.len(),
            diagnostics.group_count,
            start.elapsed().as_millis()
        );

        Ok(MatchOutcome::new(candidates, matches, assignments, diagnostics))
    }

    fn stop_diagnostics(
        &self,
        stops: &[AgencyStop],
        candidates: &[CandidateEdge],
    ) -> MatchDiagnostics {
        let with_candidates: HashSet<&str> =
            candidates.iter().map(|e| e.agency_id.as_str()).collect();

        let mut unmatched_without_candidates: Vec<String> = stops
            .iter()
            .filter(|s| s.located().is_some() && !with_candidates.contains(s.id.as_str()))
            .map(|s| s.id.clone())
            .collect();
        unmatched_without_candidates.sort();

        MatchDiagnostics {
            stops_total: stops.len(),
            stops_unlocated: stops.iter().filter(|s| s.located().is_none()).count(),
            stops_without_name: stops.iter().filter(|s| s.has_no_name()).count(),
            stops_with_candidates: with_candidates.len(),
            unmatched_without_candidates,
            features_total: self.index.len(),
            features_skipped: self.index.skipped_count(),
            candidate_count: candidates.len(),
            ..MatchDiagnostics::default()
        }
    }
}

/// Validate the agency catalog and map each stop id to its area key.
fn check_stops(stops: &[AgencyStop]) -> Result<HashMap<String, String>> {
    let mut area_keys: HashMap<String, String> = HashMap::with_capacity(stops.len());
    for stop in stops {
        let key = parent_area_key(&stop.id, stop.parent_id.as_deref());
        if area_keys.insert(stop.id.clone(), key).is_some() {
            return Err(StopMatchError::DuplicateId {
                kind: RecordKind::AgencyStop,
                id: stop.id.clone(),
            });
        }
    }

    for stop in stops {
        if let Some(parent) = stop.parent_id.as_deref() {
            if parent == stop.id || !area_keys.contains_key(parent) {
                return Err(StopMatchError::InvalidParent {
                    agency_id: stop.id.clone(),
                    parent_id: parent.to_string(),
                });
            }
        }
    }

    Ok(area_keys)
}

#[cfg(feature = "parallel")]
fn solve_all(groups: &[CandidateGroup], config: &MatchConfig) -> Vec<AssignmentOutcome> {
    use rayon::prelude::*;

    groups
        .par_iter()
        .map(|group| solve_group(group, config))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn solve_all(groups: &[CandidateGroup], config: &MatchConfig) -> Vec<AssignmentOutcome> {
    groups.iter().map(|group| solve_group(group, config)).collect()
}
