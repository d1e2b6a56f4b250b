//! Error types for the stop matcher.
//!
//! Only upstream contract breaches are errors. Missing locations, missing
//! names, unparseable direction hints and oversized groups degrade
//! gracefully and are reported through `MatchDiagnostics` instead.

use thiserror::Error;

/// Which catalog an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    AgencyStop,
    MappedFeature,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::AgencyStop => f.write_str("agency stop"),
            RecordKind::MappedFeature => f.write_str("mapped feature"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StopMatchError {
    /// A candidate edge references a feature that is not in the index.
    #[error("candidate for {agency_id} references unknown feature {feature_id}")]
    UnknownFeature {
        agency_id: String,
        feature_id: String,
    },

    /// A candidate edge references an agency stop that was not part of the run.
    #[error("candidate references unknown agency stop {agency_id}")]
    UnknownAgencyStop { agency_id: String },

    /// The same id appears twice in one input catalog.
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: RecordKind, id: String },

    /// `parent_id` names a stop that does not exist.
    #[error("agency stop {agency_id} has unknown parent {parent_id}")]
    InvalidParent {
        agency_id: String,
        parent_id: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StopMatchError>;

/// Turns lookups that must succeed into invariant-violation errors.
pub trait OptionExt<T> {
    fn ok_or_unknown_feature(self, agency_id: &str, feature_id: &str) -> Result<T>;
    fn ok_or_unknown_stop(self, agency_id: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_feature(self, agency_id: &str, feature_id: &str) -> Result<T> {
        self.ok_or_else(|| StopMatchError::UnknownFeature {
            agency_id: agency_id.to_string(),
            feature_id: feature_id.to_string(),
        })
    }

    fn ok_or_unknown_stop(self, agency_id: &str) -> Result<T> {
        self.ok_or_else(|| StopMatchError::UnknownAgencyStop {
            agency_id: agency_id.to_string(),
        })
    }
}
