//! Direction evidence from a stop's direction hint.
//!
//! Agency quays often carry a hint like "Ri Stuttgart Thingstraße" naming
//! where departures head. Mapped platforms know the names of their route
//! neighbours. If the destination resembles the successors but not the
//! predecessors, the platform serves the stated direction; the reverse
//! pattern means it serves the opposite one.

use serde::{Deserialize, Serialize};

use crate::names::{fold_abbreviations, ngram_similarity, strip_parenthetical};
use crate::{AgencyStop, MappedFeature, MatchConfig};

/// Outcome of comparing a direction hint with route neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionEvidence {
    /// Destination resembles the successors.
    Confirmed,
    /// Destination resembles the predecessors.
    Reversed,
    /// A destination was found but neither side wins clearly.
    Inconclusive,
    /// The hint carries no recognized direction marker.
    NoInformation,
}

impl DirectionEvidence {
    pub fn score(&self) -> f64 {
        match self {
            DirectionEvidence::Confirmed => 1.0,
            DirectionEvidence::Reversed => -1.0,
            DirectionEvidence::Inconclusive => 0.0,
            DirectionEvidence::NoInformation => -0.5,
        }
    }
}

/// A literal that introduces a destination phrase, and the characters to
/// trim from the start of what follows it.
pub struct DirectionMarker {
    pub token: &'static str,
    pub trim: &'static [char],
}

const SEPARATORS: &[char] = &[' ', '.', ':', '-'];

/// Checked in order; longer markers precede their prefixes.
/// Matching is case- and punctuation-sensitive.
pub const DIRECTION_MARKERS: &[DirectionMarker] = &[
    DirectionMarker { token: "Fahrtrichtung", trim: SEPARATORS },
    DirectionMarker { token: "Richtung", trim: SEPARATORS },
    DirectionMarker { token: "Richtg.", trim: SEPARATORS },
    DirectionMarker { token: "Richt", trim: SEPARATORS },
    DirectionMarker { token: "eRtg ", trim: SEPARATORS },
    DirectionMarker { token: "Rtg ", trim: SEPARATORS },
    DirectionMarker { token: "Ri.", trim: SEPARATORS },
    DirectionMarker { token: "Ri-", trim: SEPARATORS },
    DirectionMarker { token: "Ri:", trim: SEPARATORS },
    DirectionMarker { token: "Ri ", trim: SEPARATORS },
    DirectionMarker { token: "FR ", trim: SEPARATORS },
    DirectionMarker { token: "Dir.", trim: SEPARATORS },
    DirectionMarker { token: ">", trim: &[' ', '>'] },
];

/// Destination phrase following the first recognized marker.
///
/// # Example
/// ```
/// use stopmatch::direction::parse_destination;
/// assert_eq!(parse_destination("Ri Stuttgart Thingstraße").as_deref(), Some("Stuttgart Thingstraße"));
/// assert_eq!(parse_destination("Steig 2"), None);
/// ```
pub fn parse_destination(hint: &str) -> Option<String> {
    for marker in DIRECTION_MARKERS {
        if let Some(pos) = hint.find(marker.token) {
            let rest = hint[pos + marker.token.len()..]
                .trim_start_matches(marker.trim)
                .trim();
            if rest.is_empty() {
                return None;
            }
            return Some(rest.to_string());
        }
    }
    None
}

/// Drop a leading place name ("Stuttgart Wurmlinger Straße" -> "wurmlinger straße").
fn strip_place_prefix(part: &str, places: &[String]) -> String {
    for place in places {
        if let Some(rest) = part.strip_prefix(place.as_str()) {
            if rest.starts_with(' ') {
                let rest = rest.trim();
                if !rest.is_empty() {
                    return rest.to_string();
                }
            }
        }
    }
    part.to_string()
}

fn split_names(list: &str) -> Vec<String> {
    strip_parenthetical(list)
        .split('/')
        .map(fold_abbreviations)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Destination parts of a stop, normalized for neighbour comparison.
/// `None` when the hint has no recognized marker.
pub fn destination_parts(stop: &AgencyStop) -> Option<Vec<String>> {
    let destination = parse_destination(stop.direction_hint.as_deref()?)?;

    let places: Vec<String> = [&stop.locality, &stop.municipality]
        .into_iter()
        .flatten()
        .map(|p| fold_abbreviations(p))
        .filter(|p| !p.is_empty())
        .collect();

    Some(
        split_names(&destination)
            .into_iter()
            .map(|part| strip_place_prefix(&part, &places))
            .collect(),
    )
}

/// Best pairwise similarity between destination parts and a slash-joined
/// neighbour list.
fn best_similarity(parts: &[String], neighbours: Option<&str>) -> f64 {
    let Some(neighbours) = neighbours else {
        return 0.0;
    };
    let names = split_names(neighbours);
    parts
        .iter()
        .flat_map(|part| names.iter().map(move |name| ngram_similarity(part, name)))
        .fold(0.0, f64::max)
}

/// Compare a stop's direction hint against a feature's route neighbours.
pub fn direction_evidence(
    stop: &AgencyStop,
    feature: &MappedFeature,
    config: &MatchConfig,
) -> DirectionEvidence {
    let Some(parts) = destination_parts(stop) else {
        return DirectionEvidence::NoInformation;
    };

    let next = best_similarity(&parts, feature.next_names.as_deref());
    let prev = best_similarity(&parts, feature.prev_names.as_deref());

    if next > config.direction_min_similarity && next - prev >= config.direction_min_margin {
        DirectionEvidence::Confirmed
    } else if prev > config.direction_min_similarity && prev - next >= config.direction_min_margin
    {
        DirectionEvidence::Reversed
    } else {
        DirectionEvidence::Inconclusive
    }
}
