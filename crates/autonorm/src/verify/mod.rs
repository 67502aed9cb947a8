//! Post-synthesis schema verification.
//!
//! A verification failure here means the synthesizer or detector produced an
//! inconsistent schema, not that the input data was dirty: every primary key
//! must be unique and non-null over its rows, no selected key column may be a
//! foreign key, every relationship must hold referential integrity against an
//! existing target, and the relationship graph must be acyclic.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{ColumnRole, ForeignKey};
use crate::synth::SynthTable;

/// Tolerated fraction of dangling foreign-key values before an error.
const INTEGRITY_TOLERANCE: f64 = 0.9;

/// Structured verification outcome, carried on the run result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Violations that indicate a synthesis bug; any entry fails the run.
    pub errors: Vec<String>,

    /// Observations worth surfacing that do not fail the run.
    pub warnings: Vec<String>,
}

impl SchemaReport {
    /// Whether verification passed (no errors).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Verify the synthesized schema and the validated relationship list.
pub fn verify_schema(tables: &[SynthTable], relationships: &[ForeignKey]) -> SchemaReport {
    let mut report = SchemaReport::default();
    let by_name: HashMap<&str, &SynthTable> =
        tables.iter().map(|t| (t.table.name.as_str(), t)).collect();

    verify_primary_keys(tables, relationships, &mut report);
    verify_relationships(relationships, &by_name, &mut report);
    verify_acyclic(relationships, &mut report);

    for error in &report.errors {
        warn!(error = error.as_str(), "schema verification error");
    }
    report
}

fn verify_primary_keys(
    tables: &[SynthTable],
    relationships: &[ForeignKey],
    report: &mut SchemaReport,
) {
    for table in tables {
        let name = &table.table.name;
        if table.primary_key.is_empty() {
            report
                .warnings
                .push(format!("table {} has no primary key", name));
            continue;
        }

        let indices: Vec<usize> = table
            .primary_key
            .iter()
            .filter_map(|c| table.table.column_index(c))
            .collect();
        if indices.len() != table.primary_key.len() {
            report.errors.push(format!(
                "table {}: key columns {:?} not all present",
                name, table.primary_key
            ));
            continue;
        }

        let mut seen: HashSet<String> = HashSet::new();
        for row in 0..table.table.row_count() {
            if indices.iter().any(|&i| table.table.rows[row][i].is_null()) {
                report.errors.push(format!(
                    "table {}: key {:?} contains NULL values",
                    name, table.primary_key
                ));
                break;
            }
            if !seen.insert(table.table.row_key(row, &indices)) {
                report.errors.push(format!(
                    "table {}: key {:?} is not unique",
                    name, table.primary_key
                ));
                break;
            }
        }

        // A selected key column must never be a foreign key. Inherited parent
        // keys are the sanctioned exception: child tables are legitimately
        // keyed by (parent key, discriminator).
        for pk_col in &table.primary_key {
            if table.role(pk_col) == ColumnRole::InheritedKey {
                continue;
            }
            let is_fk = relationships
                .iter()
                .any(|fk| fk.table == *name && fk.column == *pk_col && fk.ref_table != *name);
            if is_fk {
                report.errors.push(format!(
                    "table {}: key column {} is also a foreign key",
                    name, pk_col
                ));
            }
        }
    }
}

fn verify_relationships(
    relationships: &[ForeignKey],
    by_name: &HashMap<&str, &SynthTable>,
    report: &mut SchemaReport,
) {
    for fk in relationships {
        let source = match by_name.get(fk.table.as_str()) {
            Some(t) => *t,
            None => {
                report.errors.push(format!(
                    "relationship {}.{} → {}.{}: source table missing",
                    fk.table, fk.column, fk.ref_table, fk.ref_column
                ));
                continue;
            }
        };
        let target = match by_name.get(fk.ref_table.as_str()) {
            Some(t) => *t,
            None => {
                report.errors.push(format!(
                    "relationship {}.{} → {}.{}: target table missing",
                    fk.table, fk.column, fk.ref_table, fk.ref_column
                ));
                continue;
            }
        };
        if !source.table.has_column(&fk.column) || !target.table.has_column(&fk.ref_column) {
            report.errors.push(format!(
                "relationship {}.{} → {}.{}: columns not found",
                fk.table, fk.column, fk.ref_table, fk.ref_column
            ));
            continue;
        }

        let source_values = source.table.distinct_keys(&fk.column);
        if source_values.is_empty() {
            continue;
        }
        let target_values = target.table.distinct_keys(&fk.ref_column);
        let found = source_values
            .iter()
            .filter(|v| target_values.contains(*v))
            .count();
        let coverage = found as f64 / source_values.len() as f64;
        if coverage < INTEGRITY_TOLERANCE {
            report.errors.push(format!(
                "relationship {}.{} → {}.{}: {} of {} values missing from target",
                fk.table,
                fk.column,
                fk.ref_table,
                fk.ref_column,
                source_values.len() - found,
                source_values.len()
            ));
        } else if coverage < 1.0 {
            report.warnings.push(format!(
                "relationship {}.{} → {}.{}: {} dangling value(s) within tolerance",
                fk.table,
                fk.column,
                fk.ref_table,
                fk.ref_column,
                source_values.len() - found
            ));
        }
    }
}

/// Self-references are legitimate hierarchies; every other cycle is an error.
fn verify_acyclic(relationships: &[ForeignKey], report: &mut SchemaReport) {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for fk in relationships {
        if fk.table != fk.ref_table {
            graph.entry(fk.table.as_str()).or_default().push(fk.ref_table.as_str());
        }
    }

    fn has_cycle<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
    ) -> bool {
        visited.insert(node);
        stack.insert(node);
        if let Some(next) = graph.get(node) {
            for &n in next {
                if !visited.contains(n) {
                    if has_cycle(n, graph, visited, stack) {
                        return true;
                    }
                } else if stack.contains(n) {
                    return true;
                }
            }
        }
        stack.remove(node);
        false
    }

    let mut visited: HashSet<&str> = HashSet::new();
    for &node in graph.keys() {
        if !visited.contains(node) && has_cycle(node, &graph, &mut visited, &mut HashSet::new()) {
            report.errors.push(format!(
                "circular foreign-key dependency involving table {}",
                node
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Table, Value};
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

    fn fk(table: &str, column: &str, ref_table: &str, ref_column: &str) -> ForeignKey {
        ForeignKey {
            table: table.into(),
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
            evidence: vec![],
        }
    }

    #[test]
    fn test_clean_schema_passes() {
        let customers = synth(
            "customers",
            &["customer_id"],
            &["customer_id"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        let orders = synth(
            "orders",
            &["order_id", "customer_id"],
            &["order_id"],
            vec![
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(2), Value::Int(2)],
            ],
        );
        let rels = vec![fk("orders", "customer_id", "customers", "customer_id")];
        let report = verify_schema(&[customers, orders], &rels);
        assert!(report.passed(), "errors: {:?}", report.errors);
    }

    #[test]
    fn test_duplicate_key_fails() {
        let t = synth(
            "orders",
            &["order_id"],
            &["order_id"],
            vec![vec![Value::Int(1)], vec![Value::Int(1)]],
        );
        let report = verify_schema(&[t], &[]);
        assert!(report.errors.iter().any(|e| e.contains("not unique")));
    }

    #[test]
    fn test_null_key_fails() {
        let t = synth(
            "orders",
            &["order_id"],
            &["order_id"],
            vec![vec![Value::Int(1)], vec![Value::Null]],
        );
        let report = verify_schema(&[t], &[]);
        assert!(report.errors.iter().any(|e| e.contains("NULL")));
    }

    #[test]
    fn test_selected_key_column_as_fk_fails() {
        let a = synth(
            "orders",
            &["order_id"],
            &["order_id"],
            vec![vec![Value::Int(1)]],
        );
        let b = synth(
            "shipments",
            &["order_id"],
            &["order_id"],
            vec![vec![Value::Int(1)]],
        );
        let rels = vec![fk("shipments", "order_id", "orders", "order_id")];
        let report = verify_schema(&[a, b], &rels);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("key column order_id is also a foreign key")));
    }

    #[test]
    fn test_inherited_key_column_as_fk_allowed() {
        let orders = synth(
            "orders",
            &["order_id"],
            &["order_id"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        let mut history = synth(
            "orders_status_history",
            &["order_id", "status_date", "status"],
            &["order_id", "status_date"],
            vec![
                vec![Value::Int(1), "2024-01-01".into(), "placed".into()],
                vec![Value::Int(1), "2024-01-03".into(), "shipped".into()],
            ],
        );
        history.roles.insert("order_id".into(), ColumnRole::InheritedKey);
        let rels = vec![fk("orders_status_history", "order_id", "orders", "order_id")];
        let report = verify_schema(&[orders, history], &rels);
        assert!(report.passed(), "errors: {:?}", report.errors);
    }

    #[test]
    fn test_dangling_reference_fails() {
        let customers = synth(
            "customers",
            &["customer_id"],
            &["customer_id"],
            vec![vec![Value::Int(1)]],
        );
        let orders = synth(
            "orders",
            &["order_id", "customer_id"],
            &["order_id"],
            vec![
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(2), Value::Int(9)],
            ],
        );
        let rels = vec![fk("orders", "customer_id", "customers", "customer_id")];
        let report = verify_schema(&[customers, orders], &rels);
        assert!(report.errors.iter().any(|e| e.contains("missing from target")));
    }

    #[test]
    fn test_cycle_fails_but_self_reference_allowed() {
        let a = synth("alpha", &["alpha_id"], &["alpha_id"], vec![vec![Value::Int(1)]]);
        let b = synth("beta", &["beta_id"], &["beta_id"], vec![vec![Value::Int(1)]]);

        let cyclic = vec![
            fk("alpha", "beta_id", "beta", "beta_id"),
            fk("beta", "alpha_id", "alpha", "alpha_id"),
        ];
        let report = verify_schema(&[a.clone(), b.clone()], &cyclic);
        assert!(report.errors.iter().any(|e| e.contains("circular")));

        let self_ref = vec![fk("alpha", "parent_alpha_id", "alpha", "alpha_id")];
        let report = verify_schema(&[a, b], &self_ref);
        assert!(!report.errors.iter().any(|e| e.contains("circular")));
    }
}
