//! Loading input files into in-memory tables.
//!
//! The pipeline's input contract is a set of fully materialized [`Table`]s;
//! this module fills it from a directory of `.csv` and `.json` files, one
//! table per file, table name taken from the file stem. Unreadable or
//! structurally empty files are reported and skipped so the remaining tables
//! still run.

use std::fs::File;
use std::path::{Path, PathBuf};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{Table, Value};
use crate::error::{NormalizeError, Result};

/// A file that could not be loaded as a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFailure {
    /// Table name (file stem) the file would have produced.
    pub table: String,

    /// Path of the offending file.
    pub path: PathBuf,

    /// Why loading failed.
    pub message: String,
}

/// Result of loading a directory of input files.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Successfully loaded tables, in file-name order.
    pub tables: Vec<Table>,

    /// Files that were skipped, with reasons.
    pub failures: Vec<LoadFailure>,
}

/// Load every `.csv` and `.json` file under `dir` into a table.
///
/// Per-file failures land in the outcome's failure list; only an unreadable
/// directory itself is an error.
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<LoadOutcome> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("csv") | Some("json")
            )
        })
        .collect();
    paths.sort();

    let mut outcome = LoadOutcome::default();
    for path in paths {
        let table_name = table_name_for(&path);
        match load_file(&path) {
            Ok(table) => {
                info!(
                    table = table.name.as_str(),
                    rows = table.row_count(),
                    columns = table.column_count(),
                    "loaded input table"
                );
                outcome.tables.push(table);
            }
            Err(err) => {
                warn!(
                    table = table_name.as_str(),
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable input file"
                );
                outcome.failures.push(LoadFailure {
                    table: table_name,
                    path,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(outcome)
}

/// Load one file into a table. The table name is the file stem.
pub fn load_file(path: &Path) -> Result<Table> {
    let name = table_name_for(path);
    let table = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => load_csv(path, &name)?,
        Some("json") => load_json(path, &name)?,
        other => {
            return Err(NormalizeError::input(
                name,
                format!("unsupported file extension {:?}", other),
            ))
        }
    };
    if table.is_structurally_empty() {
        return Err(NormalizeError::input(
            table.name,
            "file contains no columns or no rows",
        ));
    }
    Ok(table)
}

fn table_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string()
}

fn load_csv(path: &Path, name: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut table = Table::new(name, columns);

    for record in reader.records() {
        let record = record?;
        let mut row: Vec<Value> = record
            .iter()
            .map(|cell| {
                let trimmed = cell.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    Value::Text(trimmed.to_string())
                }
            })
            .collect();
        // Flexible records may be ragged; pad or truncate to the header.
        row.resize(table.column_count(), Value::Null);
        table.push_row(row);
    }
    Ok(table)
}

fn load_json(path: &Path, name: &str) -> Result<Table> {
    let file = File::open(path)?;
    let parsed: serde_json::Value = serde_json::from_reader(file)?;

    let rows = match parsed {
        serde_json::Value::Array(rows) => rows,
        _ => {
            return Err(NormalizeError::input(
                name,
                "expected a JSON array of flat objects",
            ))
        }
    };

    // Column set is the union of keys, in first-seen order.
    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        if let serde_json::Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut table = Table::new(name, columns);
    for row in &rows {
        let map = match row {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(NormalizeError::input(
                    name,
                    format!("expected a JSON object per row, got {}", other),
                ))
            }
        };
        let cells: Vec<Value> = table
            .columns
            .iter()
            .map(|col| json_scalar(map.get(col)))
            .collect();
        table.push_row(cells);
    }
    Ok(table)
}

fn json_scalar(value: Option<&serde_json::Value>) -> Value {
    match value {
        None | Some(serde_json::Value::Null) => Value::Null,
        Some(serde_json::Value::Bool(b)) => Value::Bool(*b),
        Some(serde_json::Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(d) = n.as_f64().and_then(Decimal::from_f64) {
                Value::Decimal(d)
            } else {
                Value::Text(n.to_string())
            }
        }
        Some(serde_json::Value::String(s)) => Value::Text(s.clone()),
        // Nested structures stay as their JSON text; the profiler's
        // structured-field detection picks them up from there.
        Some(other) => Value::Text(other.to_string()),
    }
}
