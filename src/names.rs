//! Stop name normalization and similarity.
//!
//! Names are compared with a unigram (single character) n-gram overlap:
//! `same / (len_a + len_b - same)`, where `same` counts characters shared
//! by both strings with multiplicity. The measure is symmetric, lies in
//! `[0, 1]` and is 1 for identical non-empty strings.
//!
//! Before comparison, names are lowercased, parenthetical qualifiers are
//! removed, common abbreviations are folded and trailing generic words
//! ("Bahnhof", "Haltestelle", "station", ...) are dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which stop name produced a name similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameVariant {
    Short,
    Long,
    /// A name was missing on one side; the fixed fallback similarity was used.
    Substituted,
}

/// How an abbreviation fold applies to a lowercased token.
#[derive(Debug, Clone, Copy)]
enum FoldScope {
    /// The whole token must equal the pattern.
    Token,
    /// The token must end with the pattern (German compounds: "Hauptstr.").
    TokenSuffix,
}

struct Fold {
    pattern: &'static str,
    replacement: &'static str,
    scope: FoldScope,
}

const ABBREVIATION_FOLDS: &[Fold] = &[
    Fold { pattern: "str.", replacement: "straße", scope: FoldScope::TokenSuffix },
    Fold { pattern: "strasse", replacement: "straße", scope: FoldScope::TokenSuffix },
    Fold { pattern: "pl.", replacement: "platz", scope: FoldScope::TokenSuffix },
    Fold { pattern: "hbf", replacement: "hauptbahnhof", scope: FoldScope::Token },
    Fold { pattern: "hbf.", replacement: "hauptbahnhof", scope: FoldScope::Token },
    Fold { pattern: "bf", replacement: "bahnhof", scope: FoldScope::Token },
    Fold { pattern: "bf.", replacement: "bahnhof", scope: FoldScope::Token },
    Fold { pattern: "st.", replacement: "sankt", scope: FoldScope::Token },
];

/// Trailing words that say "this is a stop" and carry no identity.
const GENERIC_SUFFIXES: &[&str] = &[
    "bahnhof",
    "haltestelle",
    "haltepunkt",
    "hp",
    "station",
    "halt",
    "stop",
    "gare",
];

/// Words that mark a stop as a hub with many quays nearby.
const HUB_MARKERS: &[&str] = &[
    "hauptbahnhof",
    "bahnhof",
    "station",
    "terminal",
    "airport",
    "flughafen",
    "zob",
];

/// Remove `(...)` and `[...]` annotations.
pub fn strip_parenthetical(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn fold_token(token: &str) -> String {
    for fold in ABBREVIATION_FOLDS {
        match fold.scope {
            FoldScope::Token if token == fold.pattern => return fold.replacement.to_string(),
            FoldScope::TokenSuffix if token.ends_with(fold.pattern) => {
                let stem = &token[..token.len() - fold.pattern.len()];
                return format!("{}{}", stem, fold.replacement);
            }
            _ => {}
        }
    }
    token.to_string()
}

fn tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == ',' || c == '-')
        .filter(|t| !t.is_empty())
        .map(fold_token)
        .collect()
}

/// Lowercase and fold abbreviations, keeping every word.
pub fn fold_abbreviations(text: &str) -> String {
    tokens(text).join(" ")
}

/// Canonical form used for name comparison.
///
/// Generic trailing words are only dropped while something else remains,
/// so "Bahnhof" alone normalizes to itself.
pub fn normalize_name(name: &str) -> String {
    let mut parts = tokens(&strip_parenthetical(name));
    while parts.len() > 1
        && parts
            .last()
            .is_some_and(|last| GENERIC_SUFFIXES.contains(&last.as_str()))
    {
        parts.pop();
    }
    parts.join(" ")
}

/// Heuristic: names of stations, terminals and airports.
pub fn is_hub_name(name: &str) -> bool {
    tokens(&strip_parenthetical(name)).iter().any(|t| {
        HUB_MARKERS.contains(&t.as_str()) || t.ends_with("bahnhof") || t.ends_with("station")
    })
}

fn char_counts(s: &str) -> (HashMap<char, usize>, usize) {
    let mut counts = HashMap::new();
    let mut total = 0;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    (counts, total)
}

/// Unigram overlap similarity of two strings, case-insensitive, no other
/// normalization. Empty input on either side yields 0.
pub fn ngram_similarity(a: &str, b: &str) -> f64 {
    let (counts_a, len_a) = char_counts(&a.to_lowercase());
    let (counts_b, len_b) = char_counts(&b.to_lowercase());
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let same: usize = counts_a
        .iter()
        .map(|(c, n)| (*n).min(counts_b.get(c).copied().unwrap_or(0)))
        .sum();
    if same == 0 {
        return 0.0;
    }

    same as f64 / (len_a + len_b - same) as f64
}

/// Similarity of two stop names after normalization.
///
/// A name that normalizes to nothing is compared in its raw form.
///
/// # Example
/// ```
/// use stopmatch::name_similarity;
/// assert_eq!(name_similarity("Stuttgart Hbf", "Stuttgart Hauptbahnhof"), 1.0);
/// assert!(name_similarity("Rathaus", "Marktplatz") < 0.5);
/// ```
pub fn name_similarity(a: &str, b: &str) -> f64 {
    ngram_similarity(&normalized_or_raw(a), &normalized_or_raw(b))
}

fn normalized_or_raw(name: &str) -> String {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        name.to_lowercase()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_compound_street() {
        assert_eq!(fold_token("hauptstr."), "hauptstraße");
        assert_eq!(fold_token("hbf"), "hauptbahnhof");
        assert_eq!(fold_token("rathaus"), "rathaus");
    }

    #[test]
    fn test_generic_suffix_kept_when_alone() {
        assert_eq!(normalize_name("Bahnhof"), "bahnhof");
        assert_eq!(normalize_name("Ensingen Bahnhof"), "ensingen");
    }
}
