//! Primary key selection.
//!
//! Given the candidate keys enumerated by the dependency profiler, choose
//! exactly one key per table, or synthesize a surrogate when no natural
//! candidate survives. Detected foreign-key columns are never eligible as or
//! within a primary key.

use std::collections::HashSet;

use tracing::info;

use crate::core::{CandidateKey, CandidateKind, RejectedCandidate, Table};
use crate::profile::ColumnProfile;

use super::identity::{key_eligibility, IdentityConfidence};

/// How the table's key was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// A natural key selected from the data.
    Natural,

    /// A generated surrogate integer key.
    Surrogate,
}

/// The selected primary key for a table.
#[derive(Debug, Clone)]
pub struct KeySelection {
    /// Natural or surrogate.
    pub kind: KeyKind,

    /// Key columns. For surrogates, the single generated column name.
    pub columns: Vec<String>,

    /// Why this key was chosen (or why the fallback was taken).
    pub reason: String,
}

impl KeySelection {
    /// Convenience constructor for pre-assigned keys on synthesized tables.
    pub fn natural(columns: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: KeyKind::Natural,
            columns,
            reason: reason.into(),
        }
    }
}

/// Outcome of key selection, including rejected candidates for the audit log.
#[derive(Debug)]
pub struct KeyDecision {
    /// The selected key.
    pub selection: KeySelection,

    /// Natural candidates that were considered and rejected.
    pub rejected: Vec<RejectedCandidate>,
}

/// Select a primary key for a table.
///
/// `fk_columns` carries columns known (or hinted) to be foreign keys; these
/// are excluded from candidacy regardless of their other qualities.
pub fn select_primary_key(
    table: &Table,
    profiles: &[ColumnProfile],
    candidates: &[CandidateKey],
    fk_columns: &HashSet<String>,
) -> KeyDecision {
    let mut rejected = Vec::new();
    let mut scored: Vec<(i32, KeySelection)> = Vec::new();

    for profile in profiles {
        let name = &profile.name;
        let gate = key_eligibility(name);
        if !gate.eligible {
            // Unremarkable columns are not worth an audit entry; only record
            // ones that were unique and might look key-like to a reader.
            if profile.is_unique_non_null() && profile.key_eligible() {
                rejected.push(RejectedCandidate {
                    kind: CandidateKind::Key,
                    table: table.name.clone(),
                    subject: name.clone(),
                    evidence: vec![format!("unique but {}", gate.reason)],
                });
            }
            continue;
        }

        if fk_columns.contains(name) || is_repeating_foreign_key(table, name) {
            rejected.push(RejectedCandidate {
                kind: CandidateKind::Key,
                table: table.name.clone(),
                subject: name.clone(),
                evidence: vec!["column is a detected foreign key".to_string()],
            });
            continue;
        }

        if !profile.key_eligible() {
            rejected.push(RejectedCandidate {
                kind: CandidateKind::Key,
                table: table.name.clone(),
                subject: name.clone(),
                evidence: vec!["multivalued/structured or empty column".to_string()],
            });
            continue;
        }

        if !profile.is_unique_non_null() {
            rejected.push(RejectedCandidate {
                kind: CandidateKind::Key,
                table: table.name.clone(),
                subject: name.clone(),
                evidence: vec![format!(
                    "not unique and non-null: {} distinct over {} non-null of {} rows",
                    profile.distinct_count, profile.non_null_count, profile.row_count
                )],
            });
            continue;
        }

        let mut score = 100;
        score += match gate.confidence {
            IdentityConfidence::High => 20,
            IdentityConfidence::Moderate => 10,
            IdentityConfidence::None => 0,
        };
        let lower = name.to_ascii_lowercase();
        if lower.ends_with("_id") {
            score += 15;
        } else if lower.ends_with("_key") || lower.ends_with("_code") {
            score += 10;
        }
        if name.len() > 20 {
            score -= 5;
        }

        scored.push((
            score,
            KeySelection {
                kind: KeyKind::Natural,
                columns: vec![name.clone()],
                reason: format!("identity column ({}), unique, non-null", gate.reason),
            },
        ));
    }

    // Composite candidates rank below every single-column natural key.
    // Junction-table members repeat by nature, so only columns already
    // identified as foreign keys disqualify a composite.
    for candidate in candidates.iter().filter(|c| !c.is_single()) {
        if candidate.columns.iter().any(|c| fk_columns.contains(c)) {
            rejected.push(RejectedCandidate {
                kind: CandidateKind::Key,
                table: table.name.clone(),
                subject: candidate.columns.join("+"),
                evidence: vec!["composite contains a detected foreign key".to_string()],
            });
            continue;
        }
        let score = 85 - 5 * candidate.columns.len() as i32;
        scored.push((
            score,
            KeySelection {
                kind: KeyKind::Natural,
                columns: candidate.columns.clone(),
                reason: format!(
                    "composite key with identity semantics: {}",
                    candidate.columns.join(", ")
                ),
            },
        ));
    }

    if let Some((_, selection)) = scored.into_iter().max_by_key(|(s, _)| *s) {
        return KeyDecision {
            selection,
            rejected,
        };
    }

    let surrogate = surrogate_key_name(&table.name, &table.columns);
    info!(
        table = table.name.as_str(),
        surrogate = surrogate.as_str(),
        "no natural key found, synthesizing surrogate"
    );
    KeyDecision {
        selection: KeySelection {
            kind: KeyKind::Surrogate,
            columns: vec![surrogate],
            reason: "no identity column qualifies, generated surrogate key".to_string(),
        },
        rejected,
    }
}

/// Generate a surrogate key name that does not collide with existing columns.
pub fn surrogate_key_name(table_name: &str, existing: &[String]) -> String {
    let base = format!("{}_id", table_name);
    if !existing.iter().any(|c| c == &base) {
        return base;
    }
    let mut counter = 1;
    loop {
        let name = format!("{}_{}", base, counter);
        if !existing.iter().any(|c| c == &name) {
            return name;
        }
        counter += 1;
    }
}

/// Whether a column reads as this table's own key by name (`{table}_id` or
/// the singularized variant, e.g. `order_id` in `orders`).
pub fn is_own_key_name(table_name: &str, column: &str) -> bool {
    let lower = column.to_ascii_lowercase();
    let table = table_name.to_ascii_lowercase();
    for base in singular_forms(&table) {
        if lower == format!("{}_id", base) {
            return true;
        }
    }
    false
}

/// Table-name stems used for own-key and FK-target name matching.
pub fn singular_forms(table: &str) -> Vec<String> {
    let mut forms = vec![table.to_string()];
    if let Some(stripped) = table.strip_suffix("ies") {
        forms.push(format!("{}y", stripped));
    }
    if let Some(stripped) = table.strip_suffix("es") {
        forms.push(stripped.to_string());
    }
    if let Some(stripped) = table.strip_suffix('s') {
        forms.push(stripped.to_string());
    }
    forms
}

/// Child-table rule: a `*_id` column that is not this table's own key and
/// carries repeating values is a foreign key and can never be the PK.
pub fn is_repeating_foreign_key(table: &Table, column: &str) -> bool {
    let lower = column.to_ascii_lowercase();
    if !lower.ends_with("_id") || is_own_key_name(&table.name, column) {
        return false;
    }
    let values = table.column_values(column);
    let mut seen = HashSet::new();
    for v in values.iter().filter(|v| !v.is_null()) {
        if !seen.insert(v.key()) {
            return true;
        }
    }
    false
}

/// Presumptive key for multi-row splitting: the best identity-bearing column
/// whose values repeat (its duplicates are child rows, not a key violation).
pub fn find_presumptive_key(table: &Table, profiles: &[ColumnProfile]) -> Option<String> {
    let mut best: Option<(i32, usize, String)> = None;
    for profile in profiles {
        let name = &profile.name;
        if !profile.key_eligible() || profile.non_null_count != profile.row_count {
            continue;
        }
        // Must repeat, and must look like this table's own identifier
        // rather than a reference to another table.
        if profile.distinct_count >= profile.non_null_count || profile.distinct_count < 2 {
            continue;
        }
        let gate = key_eligibility(name);
        if !gate.eligible {
            continue;
        }
        if name.to_ascii_lowercase().ends_with("_id") && !is_own_key_name(&table.name, name) {
            continue;
        }
        let confidence_rank = match gate.confidence {
            IdentityConfidence::High => 2,
            IdentityConfidence::Moderate => 1,
            IdentityConfidence::None => 0,
        };
        let candidate = (confidence_rank, profile.distinct_count, name.clone());
        if best
            .as_ref()
            .map_or(true, |(r, d, _)| (candidate.0, candidate.1) > (*r, *d))
        {
            best = Some(candidate);
        }
    }
    best.map(|(_, _, name)| name)
}
