//! Regression expectations over a match outcome.
//!
//! Curated lists of pairs that must or must not be matched guard against
//! scoring regressions on known difficult stops.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::MatchOutcome;

/// One curated expectation.
///
/// Serialized as `{"expect": "matched", "agency_id": ..., "feature_id": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "expect", rename_all = "snake_case")]
pub enum MatchExpectation {
    Matched { agency_id: String, feature_id: String },
    NotMatched { agency_id: String, feature_id: String },
}

impl MatchExpectation {
    pub fn matched(agency_id: &str, feature_id: &str) -> Self {
        MatchExpectation::Matched {
            agency_id: agency_id.to_string(),
            feature_id: feature_id.to_string(),
        }
    }

    pub fn not_matched(agency_id: &str, feature_id: &str) -> Self {
        MatchExpectation::NotMatched {
            agency_id: agency_id.to_string(),
            feature_id: feature_id.to_string(),
        }
    }

    pub fn agency_id(&self) -> &str {
        match self {
            MatchExpectation::Matched { agency_id, .. }
            | MatchExpectation::NotMatched { agency_id, .. } => agency_id,
        }
    }

    pub fn feature_id(&self) -> &str {
        match self {
            MatchExpectation::Matched { feature_id, .. }
            | MatchExpectation::NotMatched { feature_id, .. } => feature_id,
        }
    }
}

/// An expectation the outcome does not meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub expectation: MatchExpectation,
    /// Feature actually matched to the agency stop, if any.
    pub actual_feature_id: Option<String>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let agency_id = self.expectation.agency_id();
        let feature_id = self.expectation.feature_id();
        match &self.expectation {
            MatchExpectation::Matched { .. } => {
                write!(f, "Expected match is missing: {}->{}", agency_id, feature_id)?;
                if let Some(actual) = &self.actual_feature_id {
                    write!(f, " (matched {} instead)", actual)?;
                }
                Ok(())
            }
            MatchExpectation::NotMatched { .. } => {
                write!(f, "Got unexpected match for: {}->{}", agency_id, feature_id)
            }
        }
    }
}

/// Check every expectation, returning the ones that fail in input order.
pub fn validate_outcome(
    outcome: &MatchOutcome,
    expectations: &[MatchExpectation],
) -> Vec<ValidationFailure> {
    expectations
        .iter()
        .filter_map(|expectation| {
            let actual = outcome
                .match_for_stop(expectation.agency_id())
                .map(|m| m.feature_id.as_str());
            let paired = actual == Some(expectation.feature_id());
            let failed = match expectation {
                MatchExpectation::Matched { .. } => !paired,
                MatchExpectation::NotMatched { .. } => paired,
            };
            failed.then(|| ValidationFailure {
                expectation: expectation.clone(),
                actual_feature_id: actual.map(str::to_string),
            })
        })
        .collect()
}
