//! Cross-table foreign-key detection and validation.
//!
//! Runs after synthesis, over the synthesized (not original) table set.
//! Relationships recorded during synthesis are re-checked against the
//! validation gate; new relationships are discovered by composite scoring
//! (name similarity, value overlap, cardinality fit). A relationship is only
//! materialized when its target column is the target table's primary key or
//! a single-column unique key, so the emitted schema is executable against
//! engines that require PK/UNIQUE targets.

mod score;

pub use score::{name_similarity, score_relationship, value_overlap, FkScore};

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ForeignKeyConfig;
use crate::core::{ForeignKey, SkippedRelationship, Table};
use crate::synth::SynthTable;

/// Column-name shapes that signal a self-referencing hierarchy.
static HIERARCHY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^parent_(.+)$",
        r"^(.+)_parent$",
        r"^manager_(.+)$",
        r"^supervisor_(.+)$",
        r"^chief_(.+)$",
        r"^head_(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Outcome of the cross-table pass.
#[derive(Debug, Default)]
pub struct FkOutcome {
    /// Validated relationships, ready for DDL rendering.
    pub accepted: Vec<ForeignKey>,

    /// Candidates rejected by detection or the validation gate, with reasons.
    pub skipped: Vec<SkippedRelationship>,
}

/// Detect and validate foreign-key relationships across the synthesized set.
pub fn detect_foreign_keys(tables: &[SynthTable], config: &ForeignKeyConfig) -> FkOutcome {
    let mut outcome = FkOutcome::default();
    let mut edges: Vec<(String, String)> = Vec::new();
    let by_name: HashMap<&str, &SynthTable> =
        tables.iter().map(|t| (t.table.name.as_str(), t)).collect();

    // Links recorded during synthesis go through the same gate as scored
    // candidates; synthesis already knows they hold over the data.
    for table in tables {
        for fk in &table.foreign_keys {
            let target = match by_name.get(fk.ref_table.as_str()) {
                Some(t) => *t,
                None => {
                    outcome.skipped.push(skip(fk, "target table not in synthesized set"));
                    continue;
                }
            };
            match validate_target(target, &fk.ref_column) {
                Ok(basis) => {
                    let mut accepted = fk.clone();
                    accepted.evidence.push(basis);
                    edges.push((accepted.table.clone(), accepted.ref_table.clone()));
                    push_unique(&mut outcome.accepted, accepted);
                }
                Err(reason) => outcome.skipped.push(skip(fk, &reason)),
            }
        }
    }

    // Scored detection for columns synthesis did not already link.
    for child in tables {
        for col in child.table.columns.clone() {
            if child.primary_key.contains(&col) {
                continue;
            }
            if outcome
                .accepted
                .iter()
                .any(|fk| fk.table == child.table.name && fk.column == col)
            {
                continue;
            }
            if !identifier_pattern(&col) {
                continue;
            }

            let mut passing: Vec<(&SynthTable, String, FkScore)> = Vec::new();
            for parent in tables {
                if parent.table.name == child.table.name {
                    continue;
                }
                // Composite keys are not valid single-column targets.
                if parent.primary_key.len() != 1 {
                    continue;
                }
                let pk_col = parent.primary_key[0].clone();
                let fk_score = score_relationship(&child.table, &col, &parent.table, &pk_col);
                // The source must be a full subset of the target key, or the
                // relationship cannot hold referential integrity.
                if fk_score.value_overlap < 1.0 || fk_score.cardinality_fit == 0.0 {
                    continue;
                }
                if fk_score.total >= config.acceptance_threshold {
                    passing.push((parent, pk_col, fk_score));
                } else {
                    debug!(
                        table = child.table.name.as_str(),
                        column = col.as_str(),
                        target = parent.table.name.as_str(),
                        score = fk_score.total,
                        threshold = config.acceptance_threshold,
                        "foreign-key candidate below acceptance threshold"
                    );
                }
            }

            match resolve_target(&child.table.name, &col, passing) {
                Resolution::None => {}
                Resolution::Ambiguous(names) => {
                    outcome.skipped.push(SkippedRelationship {
                        table: child.table.name.clone(),
                        column: col.clone(),
                        ref_table: names.join(" | "),
                        ref_column: String::new(),
                        reason: format!("ambiguous: could reference {}", names.join(" or ")),
                    });
                }
                Resolution::One(parent, pk_col, fk_score, note) => {
                    if creates_cycle(&edges, &child.table.name, &parent.table.name) {
                        outcome.skipped.push(SkippedRelationship {
                            table: child.table.name.clone(),
                            column: col.clone(),
                            ref_table: parent.table.name.clone(),
                            ref_column: pk_col,
                            reason: format!(
                                "would create circular dependency with {}",
                                parent.table.name
                            ),
                        });
                        continue;
                    }
                    let mut evidence = fk_score.evidence;
                    evidence.push(format!("composite score {:.2}", fk_score.total));
                    if let Some(note) = note {
                        evidence.push(note);
                    }
                    info!(
                        source = format!("{}.{}", child.table.name, col).as_str(),
                        target = format!("{}.{}", parent.table.name, pk_col).as_str(),
                        score = fk_score.total,
                        "foreign key detected"
                    );
                    edges.push((child.table.name.clone(), parent.table.name.clone()));
                    push_unique(
                        &mut outcome.accepted,
                        ForeignKey {
                            table: child.table.name.clone(),
                            column: col.clone(),
                            ref_table: parent.table.name.clone(),
                            ref_column: pk_col,
                            evidence,
                        },
                    );
                }
            }
        }
    }

    detect_self_references(tables, &mut outcome);
    outcome
}

enum Resolution<'a> {
    None,
    One(&'a SynthTable, String, FkScore, Option<String>),
    Ambiguous(Vec<String>),
}

/// Pick one target among the passing candidates, or report ambiguity.
fn resolve_target<'a>(
    child: &str,
    column: &str,
    mut passing: Vec<(&'a SynthTable, String, FkScore)>,
) -> Resolution<'a> {
    match passing.len() {
        0 => Resolution::None,
        1 => {
            let (parent, pk_col, fk_score) = passing.pop().unwrap();
            Resolution::One(parent, pk_col, fk_score, None)
        }
        _ => {
            passing.sort_by(|a, b| {
                b.2.name_similarity
                    .partial_cmp(&a.2.name_similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if passing[0].2.name_similarity > passing[1].2.name_similarity {
                let (parent, pk_col, fk_score) = passing.swap_remove(0);
                let note = format!(
                    "ambiguity resolved by name match ({} → {})",
                    column, parent.table.name
                );
                Resolution::One(parent, pk_col, fk_score, Some(note))
            } else {
                debug!(
                    table = child,
                    column,
                    "ambiguous foreign-key candidate, skipping"
                );
                Resolution::Ambiguous(
                    passing.into_iter().map(|(p, _, _)| p.table.name.clone()).collect(),
                )
            }
        }
    }
}

/// Self-referencing hierarchies: a `parent_*`/`manager_*`-shaped column whose
/// values fall inside the table's own single-column key. The many-to-one
/// cardinality check does not apply.
fn detect_self_references(tables: &[SynthTable], outcome: &mut FkOutcome) {
    for table in tables {
        if table.primary_key.len() != 1 {
            continue;
        }
        let pk_col = &table.primary_key[0];
        let pk_values = table.table.distinct_keys(pk_col);

        for col in &table.table.columns {
            if col == pk_col || !hierarchical_pattern(&table.table.name, col) {
                continue;
            }
            let values = table.table.distinct_keys(col);
            if values.is_empty() || !values.is_subset(&pk_values) {
                continue;
            }
            info!(
                table = table.table.name.as_str(),
                column = col.as_str(),
                "self-referencing hierarchy detected"
            );
            push_unique(
                &mut outcome.accepted,
                ForeignKey {
                    table: table.table.name.clone(),
                    column: col.clone(),
                    ref_table: table.table.name.clone(),
                    ref_column: pk_col.clone(),
                    evidence: vec![
                        "self-referencing hierarchy".to_string(),
                        format!("{} values are a subset of {}", col, pk_col),
                    ],
                },
            );
        }
    }
}

/// Gate: the target column must be the target's primary key or a
/// single-column unique key. Returns the basis on success.
fn validate_target(target: &SynthTable, column: &str) -> std::result::Result<String, String> {
    if !target.table.has_column(column) {
        return Err(format!("column {} missing from {}", column, target.table.name));
    }
    if target.primary_key.len() == 1 && target.primary_key[0] == column {
        return Ok(format!("{} is the primary key of {}", column, target.table.name));
    }
    if target.primary_key.contains(&column.to_string()) {
        return Err(format!(
            "{} is part of a composite key in {}",
            column, target.table.name
        ));
    }
    if is_single_column_unique(&target.table, column) {
        return Ok(format!(
            "{} is a single-column unique key of {}",
            column, target.table.name
        ));
    }
    Err(format!(
        "{} is not a primary key or single-column unique key in {}",
        column, target.table.name
    ))
}

fn is_single_column_unique(table: &Table, column: &str) -> bool {
    let values = table.column_values(column);
    if values.is_empty() || values.iter().any(|v| v.is_null()) {
        return false;
    }
    let distinct: HashSet<String> = values.iter().map(|v| v.key()).collect();
    distinct.len() == values.len()
}

/// Only identifier-shaped columns may be foreign keys.
fn identifier_pattern(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("_id")
        || lower.ends_with("id")
        || lower.contains("_key")
        || lower.contains("_code")
        || lower.contains("_ref")
}

fn hierarchical_pattern(table: &str, column: &str) -> bool {
    let col = column.to_ascii_lowercase();
    let table = table.to_ascii_lowercase();
    HIERARCHY_PATTERNS.iter().any(|re| {
        re.captures(&col)
            .and_then(|c| c.get(1))
            .map_or(false, |stem| {
                let stem = score::strip_identifier_suffix(stem.as_str());
                !stem.is_empty() && table.contains(&stem)
            })
    })
}

/// Adding `from → to`: would `to` already reach `from`?
fn creates_cycle(edges: &[(String, String)], from: &str, to: &str) -> bool {
    let mut stack = vec![to.to_string()];
    let mut seen: HashSet<String> = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == from {
            return true;
        }
        if !seen.insert(node.clone()) {
            continue;
        }
        for (a, b) in edges {
            if *a == node {
                stack.push(b.clone());
            }
        }
    }
    false
}

fn push_unique(accepted: &mut Vec<ForeignKey>, fk: ForeignKey) {
    if !accepted.iter().any(|f| f.endpoints() == fk.endpoints()) {
        accepted.push(fk);
    }
}

fn skip(fk: &ForeignKey, reason: &str) -> SkippedRelationship {
    SkippedRelationship {
        table: fk.table.clone(),
        column: fk.column.clone(),
        ref_table: fk.ref_table.clone(),
        ref_column: fk.ref_column.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnRole, Value};
    use crate::keys::KeyKind;
    use std::collections::HashMap;

    fn synth(name: &str, columns: &[&str], pk: &[&str], rows: Vec<Vec<Value>>) -> SynthTable {
        let mut table = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row);
        }
        SynthTable {
            table,
            origin: name.to_string(),
            primary_key: pk.iter().map(|c| c.to_string()).collect(),
            key_kind: KeyKind::Natural,
            key_reason: String::new(),
            roles: HashMap::new(),
            provenance: HashMap::new(),
            foreign_keys: Vec::new(),
        }
    }

    fn customers() -> SynthTable {
        synth(
            "customers",
            &["customer_id", "city"],
            &["customer_id"],
            vec![
                vec![Value::Int(1), "Oslo".into()],
                vec![Value::Int(2), "Bergen".into()],
            ],
        )
    }

    fn orders(customer_ids: &[i64]) -> SynthTable {
        synth(
            "orders",
            &["order_id", "customer_id"],
            &["order_id"],
            customer_ids
                .iter()
                .enumerate()
                .map(|(i, &c)| vec![Value::Int(i as i64 + 1), Value::Int(c)])
                .collect(),
        )
    }

    #[test]
    fn test_strong_name_and_overlap_accepted() {
        let tables = vec![customers(), orders(&[1, 2, 1, 2])];
        let outcome = detect_foreign_keys(&tables, &ForeignKeyConfig::default());
        assert_eq!(outcome.accepted.len(), 1);
        let fk = &outcome.accepted[0];
        assert_eq!(
            fk.endpoints(),
            (
                "orders".to_string(),
                "customer_id".to_string(),
                "customers".to_string(),
                "customer_id".to_string()
            )
        );
        assert!(!fk.evidence.is_empty());
    }

    #[test]
    fn test_partial_overlap_rejected() {
        // Order 3 references customer 9, which does not exist.
        let tables = vec![customers(), orders(&[1, 2, 9])];
        let outcome = detect_foreign_keys(&tables, &ForeignKeyConfig::default());
        assert!(outcome.accepted.is_empty());
    }

    #[test]
    fn test_descriptive_column_never_fk() {
        let mut child = synth(
            "shipments",
            &["shipment_id", "city"],
            &["shipment_id"],
            vec![
                vec![Value::Int(1), "Oslo".into()],
                vec![Value::Int(2), "Bergen".into()],
            ],
        );
        // Make the city column a perfect value subset of customers.city.
        child.table.rows[0][1] = "Oslo".into();
        let tables = vec![customers(), child];
        let outcome = detect_foreign_keys(&tables, &ForeignKeyConfig::default());
        assert!(outcome.accepted.is_empty());
    }

    #[test]
    fn test_gate_skips_non_unique_target() {
        let mut child = orders(&[1, 2]);
        child.foreign_keys.push(ForeignKey {
            table: "orders".into(),
            column: "customer_id".into(),
            ref_table: "customer_notes".into(),
            ref_column: "customer_id".into(),
            evidence: vec![],
        });
        // customer_id repeats in the target: not PK, not unique.
        let notes = synth(
            "customer_notes",
            &["note_id", "customer_id"],
            &["note_id"],
            vec![
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(2), Value::Int(1)],
            ],
        );
        let tables = vec![child, notes];
        let outcome = detect_foreign_keys(&tables, &ForeignKeyConfig::default());
        assert!(outcome
            .skipped
            .iter()
            .any(|s| s.ref_table == "customer_notes"
                && s.reason.contains("not a primary key or single-column unique key")));
    }

    #[test]
    fn test_gate_accepts_unique_non_pk_target() {
        let mut parent = synth(
            "customers_location",
            &["customers_location_id", "city", "state"],
            &["customers_location_id"],
            vec![
                vec![Value::Int(10), "Oslo".into(), "OS".into()],
                vec![Value::Int(20), "Bergen".into(), "VE".into()],
            ],
        );
        parent.key_kind = KeyKind::Surrogate;
        parent.roles.insert("customers_location_id".into(), ColumnRole::Surrogate);

        let mut child = customers();
        child.foreign_keys.push(ForeignKey {
            table: "customers".into(),
            column: "city".into(),
            ref_table: "customers_location".into(),
            ref_column: "city".into(),
            evidence: vec!["transitive chain".into()],
        });

        let tables = vec![parent, child];
        let outcome = detect_foreign_keys(&tables, &ForeignKeyConfig::default());
        let fk = outcome
            .accepted
            .iter()
            .find(|f| f.ref_table == "customers_location")
            .expect("unique target should pass the gate");
        assert!(fk
            .evidence
            .iter()
            .any(|e| e.contains("single-column unique key")));
    }

    #[test]
    fn test_self_referencing_hierarchy() {
        let employees = synth(
            "employees",
            &["employee_id", "manager_employee_id"],
            &["employee_id"],
            vec![
                vec![Value::Int(1), Value::Null],
                vec![Value::Int(2), Value::Int(1)],
                vec![Value::Int(3), Value::Int(1)],
            ],
        );
        let outcome = detect_foreign_keys(&[employees], &ForeignKeyConfig::default());
        assert_eq!(outcome.accepted.len(), 1);
        let fk = &outcome.accepted[0];
        assert_eq!(fk.table, fk.ref_table);
        assert_eq!(fk.column, "manager_employee_id");
        assert_eq!(fk.ref_column, "employee_id");
    }

    #[test]
    fn test_cycle_skipped() {
        // a.b_id → b already; a candidate b.a_id → a would close the loop.
        let mut a = synth(
            "alpha",
            &["alpha_id", "beta_id"],
            &["alpha_id"],
            vec![vec![Value::Int(1), Value::Int(1)], vec![Value::Int(2), Value::Int(1)]],
        );
        a.foreign_keys.push(ForeignKey {
            table: "alpha".into(),
            column: "beta_id".into(),
            ref_table: "beta".into(),
            ref_column: "beta_id".into(),
            evidence: vec![],
        });
        let b = synth(
            "beta",
            &["beta_id", "alpha_id"],
            &["beta_id"],
            vec![
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(2), Value::Int(2)],
            ],
        );
        let outcome = detect_foreign_keys(&[a, b], &ForeignKeyConfig::default());
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome
            .skipped
            .iter()
            .any(|s| s.reason.contains("circular dependency")));
    }

    #[test]
    fn test_identifier_pattern() {
        assert!(identifier_pattern("customer_id"));
        assert!(identifier_pattern("region_code"));
        assert!(!identifier_pattern("city"));
        assert!(!identifier_pattern("salary"));
    }
}
