//! Tests for validation module

use stopmatch::{
    DirectionEvidence, Match, MatchExpectation, MatchOutcome, NameVariant, validate_outcome,
};

fn matched(agency: &str, feature: &str) -> Match {
    Match {
        agency_id: agency.to_string(),
        feature_id: feature.to_string(),
        rating: 0.5,
        distance_m: 8.0,
        name_similarity: 1.0,
        matched_name: NameVariant::Short,
        platform_score: 0.9,
        mode_score: 1.0,
        direction: DirectionEvidence::Confirmed,
    }
}

fn outcome() -> MatchOutcome {
    MatchOutcome::from_matches(vec![
        matched("de:08111:6015:0:3", "271653920"),
        matched("de:08111:6015:0:4", "271654026"),
    ])
}

#[test]
fn test_all_expectations_hold() {
    let expectations = vec![
        MatchExpectation::matched("de:08111:6015:0:3", "271653920"),
        MatchExpectation::not_matched("de:08111:6015:0:3", "271654026"),
        MatchExpectation::matched("de:08111:6015:0:4", "271654026"),
        MatchExpectation::not_matched("de:08111:6001", "301614772"),
    ];
    assert!(validate_outcome(&outcome(), &expectations).is_empty());
}

#[test]
fn test_missing_match_reported() {
    let expectations = vec![MatchExpectation::matched("de:08111:6015:0:3", "271654026")];
    let failures = validate_outcome(&outcome(), &expectations);

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].actual_feature_id.as_deref(), Some("271653920"));
    assert_eq!(
        failures[0].to_string(),
        "Expected match is missing: de:08111:6015:0:3->271654026 (matched 271653920 instead)"
    );
}

#[test]
fn test_unexpected_match_reported() {
    let expectations = vec![MatchExpectation::not_matched("de:08111:6015:0:4", "271654026")];
    let failures = validate_outcome(&outcome(), &expectations);

    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].to_string(),
        "Got unexpected match for: de:08111:6015:0:4->271654026"
    );
}

#[test]
fn test_unmatched_stop_fails_matched_expectation() {
    let expectations = vec![MatchExpectation::matched("de:08231:487:0:1", "310744136")];
    let failures = validate_outcome(&outcome(), &expectations);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].actual_feature_id, None);
    assert_eq!(
        failures[0].to_string(),
        "Expected match is missing: de:08231:487:0:1->310744136"
    );
}

#[test]
fn test_expectations_from_json() {
    let json = r#"[
        {"expect": "matched", "agency_id": "de:08111:6015:0:3", "feature_id": "271653920"},
        {"expect": "not_matched", "agency_id": "de:08111:6015:0:3", "feature_id": "271654026"}
    ]"#;
    let expectations: Vec<MatchExpectation> = serde_json::from_str(json).unwrap();

    assert_eq!(
        expectations,
        vec![
            MatchExpectation::matched("de:08111:6015:0:3", "271653920"),
            MatchExpectation::not_matched("de:08111:6015:0:3", "271654026"),
        ]
    );
    assert_eq!(expectations[1].agency_id(), "de:08111:6015:0:3");
    assert_eq!(expectations[1].feature_id(), "271654026");
}
