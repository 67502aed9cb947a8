//! Composite scoring for foreign-key relationship candidates.
//!
//! A candidate relationship combines three signals: name similarity between
//! the source column and the target table/key, value overlap between the
//! source column and the target key, and the expected many-to-one cardinality
//! shape. Each scoring function returns both the number and the evidence line
//! that justifies it, so accepted and skipped relationships are auditable.

use std::collections::HashSet;

use crate::core::Table;
use crate::keys::singular_forms;

/// Weight of name similarity in the composite score.
pub const NAME_WEIGHT: f64 = 0.45;

/// Weight of value overlap in the composite score.
pub const VALUE_WEIGHT: f64 = 0.45;

/// Weight of cardinality fit in the composite score.
pub const CARDINALITY_WEIGHT: f64 = 0.10;

/// Identifier suffixes stripped when comparing a column to a table name.
const IDENTIFIER_SUFFIXES: [&str; 5] = ["_id", "_key", "_code", "_ref", "_number"];

/// Scored foreign-key candidate.
#[derive(Debug, Clone)]
pub struct FkScore {
    /// Weighted composite in [0, 1].
    pub total: f64,

    /// Name-similarity component in [0, 1].
    pub name_similarity: f64,

    /// Fraction of source distinct values found among the target key values.
    pub value_overlap: f64,

    /// 1.0 for the expected many-to-one shape, 0.0 otherwise.
    pub cardinality_fit: f64,

    /// One line per component, with the statistic behind it.
    pub evidence: Vec<String>,
}

/// Score a candidate relationship `source.column → target.key_column`.
pub fn score_relationship(
    source: &Table,
    source_col: &str,
    target: &Table,
    target_col: &str,
) -> FkScore {
    let name_similarity = name_similarity(source_col, &target.name, target_col);

    let source_values = source.distinct_keys(source_col);
    let target_values = target.distinct_keys(target_col);
    let value_overlap = value_overlap(&source_values, &target_values);

    let cardinality_fit = if target.row_count() <= source.row_count() {
        1.0
    } else {
        0.0
    };

    let total = NAME_WEIGHT * name_similarity
        + VALUE_WEIGHT * value_overlap
        + CARDINALITY_WEIGHT * cardinality_fit;

    let evidence = vec![
        format!(
            "name similarity {:.2} ({} vs {}.{})",
            name_similarity, source_col, target.name, target_col
        ),
        format!(
            "value overlap {:.0}% ({} of {} distinct values found)",
            value_overlap * 100.0,
            (value_overlap * source_values.len() as f64).round() as usize,
            source_values.len()
        ),
        format!(
            "cardinality {} ({} target rows vs {} source rows)",
            if cardinality_fit > 0.0 { "many-to-one" } else { "inverted" },
            target.row_count(),
            source.row_count()
        ),
    ];

    FkScore {
        total,
        name_similarity,
        value_overlap,
        cardinality_fit,
        evidence,
    }
}

/// Fraction of source distinct values present among the target values.
pub fn value_overlap(source: &HashSet<String>, target: &HashSet<String>) -> f64 {
    if source.is_empty() {
        return 0.0;
    }
    let found = source.iter().filter(|v| target.contains(*v)).count();
    found as f64 / source.len() as f64
}

/// Name similarity between a source column and a target table/key pair.
///
/// The identifier suffix is stripped from the source column and the remaining
/// stem is compared against the target table's singular forms and the target
/// key's own stem: exact stem match scores 1.0, containment 0.8, anything
/// else the best of token overlap and normalized edit distance.
pub fn name_similarity(source_col: &str, target_table: &str, target_col: &str) -> f64 {
    let source_stem = strip_identifier_suffix(&source_col.to_ascii_lowercase());

    let mut candidates: Vec<String> = singular_forms(&target_table.to_ascii_lowercase());
    candidates.push(strip_identifier_suffix(&target_col.to_ascii_lowercase()));

    let mut best = 0.0f64;
    for candidate in &candidates {
        if candidate.is_empty() {
            continue;
        }
        let score = if *candidate == source_stem {
            1.0
        } else if (source_stem.len() >= 3 && candidate.contains(&source_stem))
            || (candidate.len() >= 3 && source_stem.contains(candidate.as_str()))
        {
            0.8
        } else {
            token_overlap(&source_stem, candidate).max(edit_similarity(&source_stem, candidate))
        };
        best = best.max(score);
    }
    best
}

pub(crate) fn strip_identifier_suffix(name: &str) -> String {
    for suffix in IDENTIFIER_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    if let Some(stripped) = name.strip_suffix("id") {
        if stripped.len() >= 3 {
            return stripped.trim_end_matches('_').to_string();
        }
    }
    name.to_string()
}

/// Jaccard overlap of underscore-separated tokens.
fn token_overlap(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split('_').filter(|t| !t.is_empty()).collect();
    let tb: HashSet<&str> = b.split('_').filter(|t| !t.is_empty()).collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    shared as f64 / ta.union(&tb).count() as f64
}

/// 1 − normalized Levenshtein distance.
fn edit_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
