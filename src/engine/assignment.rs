//! Optimal one-to-one assignment within a candidate group.
//!
//! Each agency stop of the group is either paired with one of its candidate
//! features or left unmatched; no feature is used twice. The objective is
//!
//! ```text
//! sum(rating of matched edges) + unmatched_baseline * unmatched stops
//! ```
//!
//! The search is exhaustive depth-first over stops in id order, trying
//! candidates best first and "unmatched" last. Consumed features live in a
//! single set that is pushed and popped along the search path. Branches
//! whose optimistic bound cannot beat the incumbent are pruned; ties keep
//! the first assignment found, which makes the result deterministic.

use std::collections::HashSet;

use crate::grouping::CandidateGroup;
use crate::{CandidateEdge, MatchConfig};

/// Bound comparisons tolerate float summation noise.
const BOUND_EPSILON: f64 = 1e-12;

/// Best assignment for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub key: String,
    /// Chosen edges, ordered by agency id.
    pub edges: Vec<CandidateEdge>,
    /// Sum of the ratings of the chosen edges.
    pub total_rating: f64,
    /// Objective divided by the number of stops in the group.
    pub mean_rating: f64,
    pub stop_count: usize,
}

impl AssignmentOutcome {
    pub fn unmatched_count(&self) -> usize {
        self.stop_count - self.edges.len()
    }
}

struct Search<'a> {
    options: Vec<&'a [CandidateEdge]>,
    /// Sum of the best attainable value of stops `i..`.
    optimistic: Vec<f64>,
    baseline: f64,
    consumed: HashSet<&'a str>,
    path: Vec<Option<usize>>,
    best_value: f64,
    best_path: Vec<Option<usize>>,
}

impl Search<'_> {
    fn run(&mut self, depth: usize, value: f64) {
        if depth == self.options.len() {
            if value > self.best_value {
                self.best_value = value;
                self.best_path.clone_from(&self.path);
            }
            return;
        }
        if value + self.optimistic[depth] < self.best_value - BOUND_EPSILON {
            return;
        }

        let options = self.options[depth];
        for (i, edge) in options.iter().enumerate() {
            if self.consumed.contains(edge.feature_id.as_str()) {
                continue;
            }
            self.consumed.insert(edge.feature_id.as_str());
            self.path.push(Some(i));
            self.run(depth + 1, value + edge.rating);
            self.path.pop();
            self.consumed.remove(edge.feature_id.as_str());
        }

        self.path.push(None);
        self.run(depth + 1, value + self.baseline);
        self.path.pop();
    }
}

/// Solve one group exhaustively.
///
/// Edges rated at or below `unmatched_baseline` are ignored, since leaving
/// the stop unmatched scores at least as well.
pub fn solve_group(group: &CandidateGroup, config: &MatchConfig) -> AssignmentOutcome {
    let baseline = config.unmatched_baseline;
    let stop_count = group.stop_count();

    // BTreeMap iteration is in agency id order. Each list is kept best first.
    let filtered: Vec<Vec<CandidateEdge>> = group
        .candidates
        .values()
        .map(|edges| {
            let mut kept: Vec<CandidateEdge> =
                edges.iter().filter(|e| e.rating > baseline).cloned().collect();
            kept.sort_by(crate::grouping::compare_edges);
            kept
        })
        .collect();

    let mut optimistic = vec![0.0; filtered.len() + 1];
    for (i, edges) in filtered.iter().enumerate().rev() {
        let best = edges.first().map_or(baseline, |e| e.rating.max(baseline));
        optimistic[i] = optimistic[i + 1] + best;
    }

    let mut search = Search {
        options: filtered.iter().map(Vec::as_slice).collect(),
        optimistic,
        baseline,
        consumed: HashSet::new(),
        path: Vec::with_capacity(filtered.len()),
        best_value: f64::NEG_INFINITY,
        best_path: Vec::new(),
    };
    search.run(0, 0.0);

    let edges: Vec<CandidateEdge> = search
        .best_path
        .iter()
        .zip(&filtered)
        .filter_map(|(choice, edges)| choice.map(|i| edges[i].clone()))
        .collect();

    let total_rating: f64 = edges.iter().map(|e| e.rating).sum();
    let unmatched = stop_count - edges.len();
    let mean_rating = if stop_count == 0 {
        0.0
    } else {
        (total_rating + baseline * unmatched as f64) / stop_count as f64
    };

    AssignmentOutcome {
        key: group.key.clone(),
        edges,
        total_rating,
        mean_rating,
        stop_count,
    }
}
