//! Tests for the matching pipeline

use std::collections::HashSet;

use stopmatch::error::StopMatchError;
use stopmatch::{
    AgencyStop, CandidateEdge, DirectionEvidence, FeatureKind, GeoPoint, MappedFeature,
    MatchConfig, NameVariant, StopMatcher, TransitMode,
};

fn quay(id: &str, name: &str, lat: f64, lng: f64) -> AgencyStop {
    let mut stop = AgencyStop::new(id, name, GeoPoint::new(lat, lng));
    stop.mode = TransitMode::Bus;
    stop
}

fn platform(id: &str, name: &str, lat: f64, lng: f64, platform: Option<&str>) -> MappedFeature {
    let mut feature = MappedFeature::new(id, Some(name), GeoPoint::new(lat, lng), FeatureKind::Platform);
    feature.mode = Some(TransitMode::Bus);
    feature.assumed_platform = platform.map(str::to_string);
    feature
}

fn matcher(features: Vec<MappedFeature>) -> StopMatcher {
    StopMatcher::new(features, MatchConfig::default()).unwrap()
}

/// Two quays of Rohr Pestalozzischule on opposite sides of the road.
fn pestalozzischule() -> (Vec<AgencyStop>, Vec<MappedFeature>) {
    let mut q3 = quay("de:08111:6015:0:3", "Pestalozzischule", 48.70750, 9.11300);
    q3.locality = Some("Stuttgart".to_string());
    q3.direction_hint = Some("Ri Stuttgart Thingstraße".to_string());
    let mut q4 = quay("de:08111:6015:0:4", "Pestalozzischule", 48.70760, 9.11310);
    q4.locality = Some("Stuttgart".to_string());
    q4.direction_hint = Some("Ri Stuttgart Am Ochsenwald".to_string());

    let mut albblick = platform("n271653920", "Pestalozzischule", 48.70755, 9.11302, None);
    albblick.next_names = Some("Thingstraße".to_string());
    albblick.prev_names = Some("Am Ochsenwald".to_string());
    let mut waldburg = platform("n271654026", "Pestalozzischule", 48.70757, 9.11308, None);
    waldburg.next_names = Some("Am Ochsenwald".to_string());
    waldburg.prev_names = Some("Thingstraße".to_string());

    (vec![q3, q4], vec![albblick, waldburg])
}

#[test]
fn test_direction_separates_opposite_quays() {
    let (stops, features) = pestalozzischule();
    let outcome = matcher(features).run(&stops).unwrap();

    assert_eq!(
        outcome.match_for_stop("de:08111:6015:0:3").map(|m| m.feature_id.as_str()),
        Some("n271653920")
    );
    assert_eq!(
        outcome.match_for_stop("de:08111:6015:0:4").map(|m| m.feature_id.as_str()),
        Some("n271654026")
    );
    assert_eq!(
        outcome.match_for_stop("de:08111:6015:0:3").map(|m| m.direction),
        Some(DirectionEvidence::Confirmed)
    );
}

#[test]
fn test_platform_separates_quays() {
    let stops = vec![
        quay("de:08111:7:0:1", "Marktplatz", 48.0, 9.0),
        quay("de:08111:7:0:2", "Marktplatz", 48.0, 9.0001),
    ];
    let features = vec![
        platform("n2", "Marktplatz", 48.00002, 9.00003, Some("2")),
        platform("n1", "Marktplatz", 48.00002, 9.00008, Some("1")),
    ];

    let outcome = matcher(features).run(&stops).unwrap();
    assert_eq!(outcome.match_for_stop("de:08111:7:0:1").unwrap().feature_id, "n1");
    assert_eq!(outcome.match_for_stop("de:08111:7:0:2").unwrap().feature_id, "n2");
}

#[test]
fn test_stop_without_candidates_is_not_an_error() {
    let stops = vec![quay("de:1:2:0:1", "Rathaus", 48.0, 9.0)];
    // ~500 m away
    let features = vec![platform("n1", "Rathaus", 48.0045, 9.0, None)];

    let outcome = matcher(features).run(&stops).unwrap();
    assert!(outcome.matches.is_empty());
    assert!(outcome.candidates.is_empty());
    assert_eq!(
        outcome.diagnostics.unmatched_without_candidates,
        vec!["de:1:2:0:1".to_string()]
    );
    assert!(!outcome.is_stop_matched("de:1:2:0:1"));
}

#[test]
fn test_nameless_stop_still_matches() {
    let mut stop = AgencyStop::new("s1", "", GeoPoint::new(48.0, 9.0));
    stop.name_short = None;
    stop.name_long = None;
    let features = vec![MappedFeature::new(
        "n1",
        Some("Central Station"),
        GeoPoint::new(48.00045, 9.0),
        FeatureKind::Stop,
    )];

    let outcome = matcher(features).run(&[stop]).unwrap();
    let m = outcome.match_for_stop("s1").unwrap();
    assert_eq!(m.name_similarity, 0.3);
    assert_eq!(m.matched_name, NameVariant::Substituted);
    assert_eq!(outcome.diagnostics.stops_without_name, 1);
}

#[test]
fn test_external_ref_beats_nearer_feature() {
    let stops = vec![quay("de:1:2:0:1", "Rathaus", 48.0, 9.0)];
    let mut referenced = platform("far", "Rathausplatz Nord", 48.002, 9.0, None);
    referenced.external_ref = Some("de:1:2:0:1".to_string());
    let features = vec![platform("near", "Rathaus", 48.00005, 9.0, None), referenced];

    let outcome = matcher(features).run(&stops).unwrap();
    let m = outcome.match_for_stop("de:1:2:0:1").unwrap();
    assert_eq!(m.feature_id, "far");
    assert_eq!(m.rating, 1.0);
}

#[test]
fn test_feature_claimed_once_across_groups() {
    // Two unrelated stop areas, both close to the same single feature
    let stops = vec![
        quay("de:1:100:0:1", "Schule", 48.0, 9.0),
        quay("de:1:200:0:1", "Schule", 48.0002, 9.0),
    ];
    let features = vec![platform("n1", "Schule", 48.00018, 9.0, None)];

    let outcome = matcher(features).run(&stops).unwrap();
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].agency_id, "de:1:200:0:1");
    assert_eq!(outcome.diagnostics.feature_conflicts_dropped, 1);
    assert!(outcome.is_feature_matched("n1"));
}

#[test]
fn test_unlocated_stop_counted() {
    let mut stop = quay("de:1:2:0:1", "Rathaus", 48.0, 9.0);
    stop.location = None;
    let outcome = matcher(vec![platform("n1", "Rathaus", 48.0, 9.0, None)])
        .run(&[stop])
        .unwrap();

    assert_eq!(outcome.diagnostics.stops_unlocated, 1);
    assert_eq!(outcome.diagnostics.unmatched_stops, 1);
    assert!(outcome.diagnostics.unmatched_without_candidates.is_empty());
}

#[test]
fn test_matches_are_injective() {
    let mut stops = Vec::new();
    let mut features = Vec::new();
    for i in 0..6 {
        let lat = 48.0 + i as f64 * 0.0001;
        stops.push(quay(&format!("de:1:5:0:{}", i), "Friedhof", lat, 9.0));
        features.push(platform(&format!("n{}", i), "Friedhof", lat + 0.00003, 9.00002, None));
    }
    features.push(platform("extra", "Friedhof", 48.0002, 9.0001, None));

    let outcome = matcher(features).run(&stops).unwrap();
    let agencies: HashSet<&str> = outcome.matches.iter().map(|m| m.agency_id.as_str()).collect();
    let features: HashSet<&str> = outcome.matches.iter().map(|m| m.feature_id.as_str()).collect();
    assert_eq!(agencies.len(), outcome.matches.len());
    assert_eq!(features.len(), outcome.matches.len());
    assert_eq!(outcome.matches.len(), 6);
}

#[test]
fn test_runs_are_byte_identical() {
    let (stops, features) = pestalozzischule();
    let mut reversed = features.clone();
    reversed.reverse();

    let first = matcher(features).run(&stops).unwrap();
    let second = matcher(reversed).run(&stops).unwrap();

    assert_eq!(
        serde_json::to_string(&first.matches).unwrap(),
        serde_json::to_string(&second.matches).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.candidates).unwrap(),
        serde_json::to_string(&second.candidates).unwrap()
    );
}

#[test]
fn test_duplicate_stop_id_rejected() {
    let stops = vec![
        quay("de:1:2:0:1", "Rathaus", 48.0, 9.0),
        quay("de:1:2:0:1", "Rathaus", 48.0, 9.0),
    ];
    let result = matcher(Vec::new()).run(&stops);
    assert!(matches!(result, Err(StopMatchError::DuplicateId { .. })));
}

#[test]
fn test_unknown_parent_rejected() {
    let mut stop = quay("de:1:2:0:1", "Rathaus", 48.0, 9.0);
    stop.parent_id = Some("de:1:2".to_string());
    let result = matcher(Vec::new()).run(&[stop]);
    assert!(matches!(result, Err(StopMatchError::InvalidParent { .. })));
}

#[test]
fn test_known_parent_accepted() {
    let parent = quay("de:1:2", "Rathaus", 48.0, 9.0);
    let mut stop = quay("de:1:2:0:1", "Rathaus", 48.0, 9.0);
    stop.parent_id = Some("de:1:2".to_string());
    assert!(matcher(Vec::new()).run(&[parent, stop]).is_ok());
}

fn loaded_edge(agency: &str, feature: &str) -> CandidateEdge {
    CandidateEdge {
        agency_id: agency.to_string(),
        feature_id: feature.to_string(),
        distance_m: 12.0,
        name_similarity: 1.0,
        matched_name: NameVariant::Short,
        platform_score: 0.9,
        mode_score: 1.0,
        direction: DirectionEvidence::NoInformation,
        rating: 0.4,
    }
}

#[test]
fn test_assign_precomputed_candidates() {
    let stops = vec![quay("de:1:2:0:1", "Rathaus", 48.0, 9.0)];
    let m = matcher(vec![platform("n1", "Rathaus", 48.0, 9.0, None)]);

    let outcome = m.assign(&stops, vec![loaded_edge("de:1:2:0:1", "n1")]).unwrap();
    assert_eq!(outcome.match_for_feature("n1").unwrap().agency_id, "de:1:2:0:1");
}

#[test]
fn test_assign_rejects_unknown_feature() {
    let stops = vec![quay("de:1:2:0:1", "Rathaus", 48.0, 9.0)];
    let result = matcher(Vec::new()).assign(&stops, vec![loaded_edge("de:1:2:0:1", "ghost")]);
    assert!(matches!(result, Err(StopMatchError::UnknownFeature { .. })));
}

#[test]
fn test_assign_rejects_unknown_stop() {
    let m = matcher(vec![platform("n1", "Rathaus", 48.0, 9.0, None)]);
    let result = m.assign(&[], vec![loaded_edge("de:1:2:0:1", "n1")]);
    assert!(matches!(result, Err(StopMatchError::UnknownAgencyStop { .. })));
}

#[test]
fn test_diagnostics_totals() {
    let (stops, features) = pestalozzischule();
    let outcome = matcher(features).run(&stops).unwrap();
    let d = &outcome.diagnostics;

    assert_eq!(d.stops_total, 2);
    assert_eq!(d.features_total, 2);
    assert_eq!(d.stops_with_candidates, 2);
    assert_eq!(d.candidate_count, outcome.candidates.len());
    assert_eq!(d.group_count, 1);
    assert_eq!(d.matched_stops, 2);
    assert_eq!(d.unmatched_stops, 0);
    assert_eq!(outcome.assignments.len(), 1);
    assert_eq!(outcome.candidates_for_stop("de:08111:6015:0:3").count(), 2);
}
