//! Tests for the group assignment solver

use std::collections::HashSet;

use stopmatch::{
    CandidateEdge, CandidateGroup, DirectionEvidence, MatchConfig, NameVariant, solve_group,
};

fn edge(agency: &str, feature: &str, rating: f64) -> CandidateEdge {
    CandidateEdge {
        agency_id: agency.to_string(),
        feature_id: feature.to_string(),
        distance_m: 15.0,
        name_similarity: 0.9,
        matched_name: NameVariant::Short,
        platform_score: 0.9,
        mode_score: 1.0,
        direction: DirectionEvidence::NoInformation,
        rating,
    }
}

fn group(edges: Vec<CandidateEdge>) -> CandidateGroup {
    let mut group = CandidateGroup::new("de:1:2");
    for e in edges {
        group.push(e);
    }
    group
}

fn pairs(edges: &[CandidateEdge]) -> Vec<(&str, &str)> {
    edges
        .iter()
        .map(|e| (e.agency_id.as_str(), e.feature_id.as_str()))
        .collect()
}

#[test]
fn test_cross_assignment_beats_greedy_tie() {
    let g = group(vec![
        edge("A", "X", 0.5),
        edge("A", "Y", 0.4),
        edge("B", "X", 0.4),
        edge("B", "Y", 0.5),
    ]);

    let outcome = solve_group(&g, &MatchConfig::default());
    assert_eq!(pairs(&outcome.edges), vec![("A", "X"), ("B", "Y")]);
    assert!((outcome.total_rating - 1.0).abs() < 1e-12);
    assert!((outcome.mean_rating - 0.5).abs() < 1e-12);
    assert_eq!(outcome.unmatched_count(), 0);
}

#[test]
fn test_optimum_where_greedy_fails() {
    // Greedy gives A the 0.6 edge and leaves B empty
    let g = group(vec![
        edge("A", "X", 0.6),
        edge("A", "Y", 0.5),
        edge("B", "X", 0.55),
    ]);

    let outcome = solve_group(&g, &MatchConfig::default());
    assert_eq!(pairs(&outcome.edges), vec![("A", "Y"), ("B", "X")]);
    assert!((outcome.total_rating - 1.05).abs() < 1e-12);
}

#[test]
fn test_single_stop_picks_best() {
    let g = group(vec![edge("A", "X", 0.3), edge("A", "Y", 0.5)]);
    let outcome = solve_group(&g, &MatchConfig::default());
    assert_eq!(pairs(&outcome.edges), vec![("A", "Y")]);
    assert!((outcome.total_rating - 0.5).abs() < 1e-12);
}

#[test]
fn test_two_stops_one_feature() {
    let g = group(vec![edge("A", "X", 0.4), edge("B", "X", 0.5)]);
    let config = MatchConfig::default();

    let outcome = solve_group(&g, &config);
    assert_eq!(pairs(&outcome.edges), vec![("B", "X")]);
    assert_eq!(outcome.unmatched_count(), 1);
    let expected_mean = (0.5 + config.unmatched_baseline) / 2.0;
    assert!((outcome.mean_rating - expected_mean).abs() < 1e-12);
}

#[test]
fn test_empty_group() {
    let outcome = solve_group(&CandidateGroup::new("empty"), &MatchConfig::default());
    assert!(outcome.edges.is_empty());
    assert_eq!(outcome.total_rating, 0.0);
    assert_eq!(outcome.mean_rating, 0.0);
    assert_eq!(outcome.stop_count, 0);
}

#[test]
fn test_equal_totals_favour_first_stop_by_id() {
    let g = group(vec![edge("B", "X", 0.5), edge("A", "X", 0.5)]);
    let outcome = solve_group(&g, &MatchConfig::default());
    assert_eq!(pairs(&outcome.edges), vec![("A", "X")]);
}

#[test]
fn test_assignment_is_injective() {
    let mut edges = Vec::new();
    for (s, agency) in ["A", "B", "C", "D", "E"].iter().enumerate() {
        for (f, feature) in ["V", "W", "X", "Y"].iter().enumerate() {
            let rating = 0.1 + ((s * 7 + f * 3) % 10) as f64 / 20.0;
            edges.push(edge(agency, feature, rating));
        }
    }

    let outcome = solve_group(&group(edges), &MatchConfig::default());
    let features: HashSet<&str> = outcome.edges.iter().map(|e| e.feature_id.as_str()).collect();
    let agencies: HashSet<&str> = outcome.edges.iter().map(|e| e.agency_id.as_str()).collect();
    assert_eq!(features.len(), outcome.edges.len());
    assert_eq!(agencies.len(), outcome.edges.len());
    // Four features, five stops
    assert_eq!(outcome.edges.len(), 4);
}

#[test]
fn test_matches_brute_force_optimum() {
    let ratings = [
        ("A", "X", 0.42),
        ("A", "Y", 0.40),
        ("A", "Z", 0.05),
        ("B", "X", 0.41),
        ("B", "Z", 0.39),
        ("C", "Y", 0.38),
        ("C", "Z", 0.30),
    ];
    let edges: Vec<CandidateEdge> = ratings.iter().map(|(a, f, r)| edge(a, f, *r)).collect();
    let outcome = solve_group(&group(edges), &MatchConfig::default());

    // A-X, B-Z, C-Y = 1.19 beats A-Y, B-X, C-Z = 1.11
    assert_eq!(
        pairs(&outcome.edges),
        vec![("A", "X"), ("B", "Z"), ("C", "Y")]
    );
    assert!((outcome.total_rating - 1.19).abs() < 1e-9);
}

#[test]
fn test_solution_is_deterministic() {
    let g = group(vec![
        edge("A", "X", 0.3),
        edge("A", "Y", 0.3),
        edge("B", "X", 0.3),
        edge("B", "Y", 0.3),
    ]);
    let config = MatchConfig::default();
    let first = solve_group(&g, &config);
    for _ in 0..10 {
        assert_eq!(solve_group(&g, &config), first);
    }
}
