//! In-memory table representation.
//!
//! A [`Table`] is the input contract of the pipeline: a named, ordered set of
//! columns and a row-major cell matrix, fully materialized before profiling
//! begins. The synthesizer also uses it as the working representation while
//! rewriting tables.

use std::collections::HashSet;

use super::value::Value;

/// A named table of rows.
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (for loaded files, the file stem).
    pub name: String,

    /// Ordered column names.
    pub columns: Vec<String>,

    /// Row-major cell data; every row has `columns.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. The row must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check if a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, in row order.
    #[must_use]
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|r| &r[idx]).collect(),
            None => Vec::new(),
        }
    }

    /// Distinct non-null canonical keys of one column.
    #[must_use]
    pub fn distinct_keys(&self, name: &str) -> HashSet<String> {
        self.column_values(name)
            .into_iter()
            .filter(|v| !v.is_null())
            .map(Value::key)
            .collect()
    }

    /// Canonical grouping key for a subset of columns in one row.
    ///
    /// Null components are kept as distinct empty slots; the unit separator
    /// keeps multi-column keys unambiguous.
    #[must_use]
    pub fn row_key(&self, row: usize, col_indices: &[usize]) -> String {
        let mut out = String::new();
        for (i, &c) in col_indices.iter().enumerate() {
            if i > 0 {
                out.push('\u{1f}');
            }
            out.push_str(&self.rows[row][c].key());
        }
        out
    }

    /// Project a subset of columns into a new table.
    ///
    /// Columns missing from this table are silently skipped.
    #[must_use]
    pub fn project(&self, new_name: impl Into<String>, cols: &[String]) -> Table {
        let indices: Vec<usize> = cols.iter().filter_map(|c| self.column_index(c)).collect();
        let columns: Vec<String> = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Table {
            name: new_name.into(),
            columns,
            rows,
        }
    }

    /// Remove exact duplicate rows, keeping the first occurrence.
    pub fn dedup_rows(&mut self) {
        let all: Vec<usize> = (0..self.column_count()).collect();
        let mut seen = HashSet::new();
        let mut keep = Vec::with_capacity(self.rows.len());
        for i in 0..self.rows.len() {
            if seen.insert(self.row_key(i, &all)) {
                keep.push(i);
            }
        }
        if keep.len() != self.rows.len() {
            self.rows = keep.into_iter().map(|i| self.rows[i].clone()).collect();
        }
    }

    /// Remove a column by name. Returns true if it existed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Insert a column at the front with the given values.
    pub fn insert_column_front(&mut self, name: impl Into<String>, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.insert(0, name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(0, value);
        }
    }

    /// Append a column at the end with the given values.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Whether the table carries no columns (structurally empty).
    #[must_use]
    pub fn is_structurally_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new("orders", vec!["order_id".into(), "status".into()]);
        t.push_row(vec![Value::Int(1), Value::Text("open".into())]);
        t.push_row(vec![Value::Int(2), Value::Text("closed".into())]);
        t.push_row(vec![Value::Int(2), Value::Text("closed".into())]);
        t
    }

    #[test]
    fn test_column_access() {
        let t = sample();
        assert_eq!(t.column_index("status"), Some(1));
        assert_eq!(t.column_values("order_id").len(), 3);
        assert_eq!(t.distinct_keys("order_id").len(), 2);
    }

    #[test]
    fn test_dedup_rows() {
        let mut t = sample();
        t.dedup_rows();
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn test_project_and_remove() {
        let mut t = sample();
        let p = t.project("statuses", &["status".into()]);
        assert_eq!(p.columns, vec!["status".to_string()]);
        assert_eq!(p.row_count(), 3);

        assert!(t.remove_column("status"));
        assert_eq!(t.columns, vec!["order_id".to_string()]);
        assert_eq!(t.rows[0].len(), 1);
    }

    #[test]
    fn test_insert_column_front() {
        let mut t = sample();
        t.insert_column_front("seq", vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(t.columns[0], "seq");
        assert_eq!(t.rows[2][0], Value::Int(3));
    }

    #[test]
    fn test_row_key_separates_columns() {
        let mut t = Table::new("x", vec!["a".into(), "b".into()]);
        t.push_row(vec![Value::Text("ab".into()), Value::Text("c".into())]);
        t.push_row(vec![Value::Text("a".into()), Value::Text("bc".into())]);
        assert_ne!(t.row_key(0, &[0, 1]), t.row_key(1, &[0, 1]));
    }
}
