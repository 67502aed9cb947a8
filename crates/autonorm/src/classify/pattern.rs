//! Multi-row pattern classification.
//!
//! When a presumptive key column repeats across rows, the table is not in
//! violation of its key: it is an event log, a status history, or a child
//! record set. Classification decides how the split-off child table is keyed
//! (parent key + discriminator vs. surrogate); it never rejects the split.

use std::collections::{HashMap, HashSet};

use crate::core::{MultiRowPattern, Table};
use crate::profile::is_functional_dependency;

const TEMPORAL_INDICATORS: [&str; 9] = [
    "date", "time", "timestamp", "created", "updated", "modified", "occurred", "logged",
    "recorded",
];

const STATUS_INDICATORS: [&str; 6] = ["status", "state", "stage", "phase", "step", "condition"];

const ITEM_INDICATORS: [&str; 6] = ["item", "line", "detail", "entry", "component", "part"];

const SEQUENCE_INDICATORS: [&str; 7] = [
    "seq", "sequence", "order", "position", "index", "number", "rank",
];

/// Result of multi-row classification for one presumptive key column.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Detected pattern ([`MultiRowPattern::None`] when the key is unique).
    pub pattern: MultiRowPattern,

    /// Column to pair with the parent key when keying the child table.
    /// `None` means the child receives a surrogate key.
    pub discriminator: Option<String>,

    /// Columns functionally determined by the key (stay with the parent).
    pub stable_columns: Vec<String>,

    /// Columns that vary across repeats of the key (move to the child).
    pub varying_columns: Vec<String>,

    /// Human-readable justifications.
    pub evidence: Vec<String>,
}

fn name_matches(name: &str, indicators: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    indicators.iter().any(|ind| lower.contains(ind))
}

/// Classify the repeating-row shape of `table` around `key_col`.
pub fn classify_multi_row(table: &Table, key_col: &str) -> PatternMatch {
    let values = table.column_values(key_col);
    let mut seen = HashSet::new();
    let duplicate_count = values
        .iter()
        .filter(|v| !v.is_null())
        .filter(|v| !seen.insert(v.key()))
        .count();

    let mut stable_columns = Vec::new();
    let mut varying_columns = Vec::new();
    for col in &table.columns {
        if col == key_col {
            continue;
        }
        if is_functional_dependency(table, &[key_col.to_string()], col) {
            stable_columns.push(col.clone());
        } else {
            varying_columns.push(col.clone());
        }
    }

    if duplicate_count == 0 {
        return PatternMatch {
            pattern: MultiRowPattern::None,
            discriminator: None,
            stable_columns,
            varying_columns,
            evidence: vec![format!("no duplicate values in {}", key_col)],
        };
    }

    let mut evidence = vec![format!(
        "{} duplicate values in {}",
        duplicate_count, key_col
    )];

    let temporal_cols: Vec<&String> = varying_columns
        .iter()
        .filter(|c| name_matches(c, &TEMPORAL_INDICATORS))
        .collect();
    let status_cols: Vec<&String> = varying_columns
        .iter()
        .filter(|c| name_matches(c, &STATUS_INDICATORS))
        .filter(|c| status_varies_per_key(table, key_col, c))
        .collect();

    // A status column whose readings come with their own timestamps
    // (status_date and the like) is a status history, not a generic event
    // log; only status-free temporal columns indicate event history.
    let status_associated = |col: &String| name_matches(col, &STATUS_INDICATORS);
    if !status_cols.is_empty() && temporal_cols.iter().all(|c| status_associated(c)) {
        let discriminator = temporal_cols
            .first()
            .map(|c| (*c).clone())
            .unwrap_or_else(|| status_cols[0].clone());
        evidence.push(format!("status changes in {}", status_cols[0]));
        return PatternMatch {
            pattern: MultiRowPattern::StatusHistory,
            discriminator: Some(discriminator),
            stable_columns,
            varying_columns,
            evidence,
        };
    }

    if !temporal_cols.is_empty() {
        evidence.push(format!(
            "temporal columns: {}",
            temporal_cols
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        let discriminator = temporal_cols[0].clone();
        return PatternMatch {
            pattern: MultiRowPattern::EventHistory,
            discriminator: Some(discriminator),
            stable_columns,
            varying_columns,
            evidence,
        };
    }

    if name_matches(&table.name, &ITEM_INDICATORS) {
        evidence.push("table name suggests line items".to_string());
        return PatternMatch {
            pattern: MultiRowPattern::LineItems,
            discriminator: None,
            stable_columns,
            varying_columns,
            evidence,
        };
    }

    let sequence_cols: Vec<&String> = varying_columns
        .iter()
        .filter(|c| name_matches(c, &SEQUENCE_INDICATORS))
        .collect();
    if !sequence_cols.is_empty() {
        evidence.push(format!("sequence columns: {}", sequence_cols[0]));
        return PatternMatch {
            pattern: MultiRowPattern::SequencedChildren,
            discriminator: Some(sequence_cols[0].clone()),
            stable_columns,
            varying_columns,
            evidence,
        };
    }

    evidence.push("multiple rows per identifier (generic one-to-many)".to_string());
    PatternMatch {
        pattern: MultiRowPattern::ChildRecords,
        discriminator: None,
        stable_columns,
        varying_columns,
        evidence,
    }
}

/// Whether some key value sees at least two distinct values of `status_col`.
fn status_varies_per_key(table: &Table, key_col: &str, status_col: &str) -> bool {
    let key_idx = match table.column_index(key_col) {
        Some(i) => i,
        None => return false,
    };
    let status_idx = match table.column_index(status_col) {
        Some(i) => i,
        None => return false,
    };
    let mut per_key: HashMap<String, HashSet<String>> = HashMap::new();
    for row in &table.rows {
        let key = &row[key_idx];
        let status = &row[status_idx];
        if key.is_null() || status.is_null() {
            continue;
        }
        per_key.entry(key.key()).or_default().insert(status.key());
    }
    per_key.values().any(|s| s.len() >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    #[test]
    fn test_unique_key_is_none() {
        let t = table(
            "orders",
            &["order_id", "total_amount"],
            vec![
                vec![Value::Int(1), Value::Int(10)],
                vec![Value::Int(2), Value::Int(20)],
            ],
        );
        let m = classify_multi_row(&t, "order_id");
        assert_eq!(m.pattern, MultiRowPattern::None);
    }

    #[test]
    fn test_status_history() {
        let t = table(
            "orders",
            &["order_id", "customer_id", "status", "status_date"],
            vec![
                vec![Value::Int(1), Value::Int(7), "placed".into(), "2024-01-01".into()],
                vec![Value::Int(1), Value::Int(7), "shipped".into(), "2024-01-03".into()],
                vec![Value::Int(2), Value::Int(8), "placed".into(), "2024-01-02".into()],
            ],
        );
        let m = classify_multi_row(&t, "order_id");
        assert_eq!(m.pattern, MultiRowPattern::StatusHistory);
        assert_eq!(m.discriminator, Some("status_date".to_string()));
        assert_eq!(m.stable_columns, vec!["customer_id".to_string()]);
        assert!(m.varying_columns.contains(&"status".to_string()));
    }

    #[test]
    fn test_event_history() {
        let t = table(
            "logins",
            &["user_id", "login_time", "device_text"],
            vec![
                vec![Value::Int(1), "2024-01-01 10:00:00".into(), "a".into()],
                vec![Value::Int(1), "2024-01-02 11:00:00".into(), "b".into()],
            ],
        );
        let m = classify_multi_row(&t, "user_id");
        assert_eq!(m.pattern, MultiRowPattern::EventHistory);
        assert_eq!(m.discriminator, Some("login_time".to_string()));
    }

    #[test]
    fn test_line_items_from_table_name() {
        let t = table(
            "invoice_line_items",
            &["invoice_id", "product_text"],
            vec![
                vec![Value::Int(1), "a".into()],
                vec![Value::Int(1), "b".into()],
            ],
        );
        let m = classify_multi_row(&t, "invoice_id");
        assert_eq!(m.pattern, MultiRowPattern::LineItems);
        assert_eq!(m.discriminator, None);
    }

    #[test]
    fn test_sequenced_children() {
        let t = table(
            "workflows",
            &["workflow_id", "position", "action_text"],
            vec![
                vec![Value::Int(1), Value::Int(1), "a".into()],
                vec![Value::Int(1), Value::Int(2), "b".into()],
            ],
        );
        let m = classify_multi_row(&t, "workflow_id");
        assert_eq!(m.pattern, MultiRowPattern::SequencedChildren);
        assert_eq!(m.discriminator, Some("position".to_string()));
    }

    #[test]
    fn test_generic_child_records() {
        let t = table(
            "tags",
            &["doc_id", "tag_text"],
            vec![
                vec![Value::Int(1), "a".into()],
                vec![Value::Int(1), "b".into()],
            ],
        );
        let m = classify_multi_row(&t, "doc_id");
        assert_eq!(m.pattern, MultiRowPattern::ChildRecords);
        assert_eq!(m.discriminator, None);
    }
}
