//! Per-column statistics and type/structure inference.
//!
//! Type inference tries a fixed precedence (boolean → integer → decimal →
//! date → datetime → string) and accepts the first type under which enough
//! of the non-null values parse. Multivalued and structured-field detection
//! flag columns that violate 1NF; the two classifications are mutually
//! exclusive, with structured classification taking precedence.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ProfilingConfig;
use crate::core::{ColumnType, Table, Value};

/// Delimiters recognized for multivalued (repeating group) detection.
const MULTIVALUE_DELIMITERS: [char; 3] = [',', ';', '|'];

const BOOL_TOKENS: [&str; 10] = ["true", "false", "t", "f", "yes", "no", "y", "n", "0", "1"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

static STREET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\s+[A-Za-z]+").unwrap());
static CITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*[A-Z][a-z]+").unwrap());
static STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2}\b").unwrap());
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}(-\d{4})?\b").unwrap());

/// Structured-field classification of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "components")]
pub enum StructuredField {
    /// Address-like token sequence; components are the detected parts
    /// (street, city, state, zip_code).
    Address(Vec<String>),

    /// JSON-object-like bracing; components are the first object's keys.
    JsonLike(Vec<String>),

    /// "First Last" name pattern; components are the name parts.
    FullName(Vec<String>),
}

impl StructuredField {
    /// Component column names produced when the field is decomposed.
    #[must_use]
    pub fn components(&self) -> &[String] {
        match self {
            StructuredField::Address(c) | StructuredField::JsonLike(c) | StructuredField::FullName(c) => c,
        }
    }
}

/// Multivalued classification: the delimiter that splits the repeating group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultivaluedInfo {
    /// Delimiter character used for splitting.
    pub delimiter: char,
}

/// Statistical and structural profile of one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name.
    pub name: String,

    /// Inferred scalar type.
    pub data_type: ColumnType,

    /// Total row count.
    pub row_count: usize,

    /// Non-null value count.
    pub non_null_count: usize,

    /// Distinct non-null value count.
    pub distinct_count: usize,

    /// distinct / non-null rows; 0 for an all-null column.
    pub uniqueness_ratio: f64,

    /// null / total rows.
    pub null_ratio: f64,

    /// Set when the column carries a delimiter-separated repeating group.
    pub multivalued: Option<MultivaluedInfo>,

    /// Set when the column carries a decomposable structured field.
    pub structured: Option<StructuredField>,
}

impl ColumnProfile {
    /// Whether the column may participate in key candidacy at all.
    ///
    /// Multivalued and structured columns are never key candidates, nor are
    /// all-null columns.
    #[must_use]
    pub fn key_eligible(&self) -> bool {
        self.multivalued.is_none() && self.structured.is_none() && self.non_null_count > 0
    }

    /// Whether the column is unique and non-null over the table.
    #[must_use]
    pub fn is_unique_non_null(&self) -> bool {
        self.non_null_count == self.row_count
            && self.row_count > 0
            && self.distinct_count == self.non_null_count
    }
}

/// Build profiles for every column of a table. Pure function of the input.
pub fn profile_columns(table: &Table, config: &ProfilingConfig) -> Vec<ColumnProfile> {
    table
        .columns
        .iter()
        .map(|name| profile_column(table, name, config))
        .collect()
}

/// Build the profile for a single column.
pub fn profile_column(table: &Table, name: &str, config: &ProfilingConfig) -> ColumnProfile {
    let values = table.column_values(name);
    let row_count = values.len();
    let non_null: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    let non_null_count = non_null.len();

    let distinct_count = {
        let mut keys: Vec<String> = non_null.iter().map(|v| v.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    };

    let uniqueness_ratio = if non_null_count > 0 {
        distinct_count as f64 / non_null_count as f64
    } else {
        0.0
    };
    let null_ratio = if row_count > 0 {
        (row_count - non_null_count) as f64 / row_count as f64
    } else {
        0.0
    };

    let data_type = if non_null_count == 0 {
        ColumnType::String
    } else {
        infer_type(table.name.as_str(), name, &non_null, config.type_coverage)
    };

    // Structured and multivalued classifications are mutually exclusive.
    // Structured wins: address and JSON fields legitimately contain the
    // delimiters that would otherwise read as a repeating group.
    let structured = if data_type == ColumnType::String {
        detect_structured(name, &non_null)
    } else {
        None
    };

    let multivalued = if data_type == ColumnType::String && structured.is_none() {
        detect_multivalued(&non_null, config.multivalued_fraction)
    } else {
        None
    };

    ColumnProfile {
        name: name.to_string(),
        data_type,
        row_count,
        non_null_count,
        distinct_count,
        uniqueness_ratio,
        null_ratio,
        multivalued,
        structured,
    }
}

/// Infer the scalar type of a column from its non-null values.
fn infer_type(table: &str, column: &str, non_null: &[&Value], coverage: f64) -> ColumnType {
    let total = non_null.len() as f64;
    let mut best_partial = 0.0f64;

    for ty in ColumnType::PRECEDENCE {
        if ty == ColumnType::String {
            break;
        }
        let parsed = non_null.iter().filter(|v| parses_as(v, ty)).count() as f64;
        let fraction = parsed / total;
        if fraction >= coverage {
            return ty;
        }
        best_partial = best_partial.max(fraction);
    }

    if best_partial >= 0.5 {
        warn!(
            table,
            column,
            best_partial,
            threshold = coverage,
            "ambiguous column type, defaulting to string"
        );
    }
    ColumnType::String
}

/// Whether a single value parses under a candidate type.
fn parses_as(value: &Value, ty: ColumnType) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) => ty == ColumnType::Boolean,
        Value::Int(_) => matches!(ty, ColumnType::Integer | ColumnType::Decimal),
        Value::Decimal(_) => ty == ColumnType::Decimal,
        Value::Date(_) => ty == ColumnType::Date,
        Value::DateTime(_) => ty == ColumnType::DateTime,
        Value::Text(s) => text_parses_as(s.trim(), ty),
    }
}

fn text_parses_as(s: &str, ty: ColumnType) -> bool {
    if s.is_empty() {
        return false;
    }
    match ty {
        ColumnType::Boolean => {
            let lower = s.to_ascii_lowercase();
            BOOL_TOKENS.contains(&lower.as_str())
        }
        ColumnType::Integer => s.parse::<i64>().is_ok(),
        ColumnType::Decimal => s.parse::<Decimal>().is_ok(),
        ColumnType::Date => DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(s, f).is_ok()),
        ColumnType::DateTime => DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(s, f).is_ok()),
        ColumnType::String => true,
    }
}

/// Detect a delimiter-separated repeating group.
fn detect_multivalued(non_null: &[&Value], fraction: f64) -> Option<MultivaluedInfo> {
    if non_null.is_empty() {
        return None;
    }
    let texts: Vec<&str> = non_null.iter().filter_map(|v| v.as_text()).collect();
    if texts.is_empty() {
        return None;
    }

    let mut best: Option<(char, usize)> = None;
    for delim in MULTIVALUE_DELIMITERS {
        let containing = texts.iter().filter(|s| s.contains(delim)).count();
        if best.map_or(true, |(_, c)| containing > c) {
            best = Some((delim, containing));
        }
    }
    let (delimiter, containing) = best?;
    if (containing as f64) < fraction * non_null.len() as f64 {
        return None;
    }

    // Splitting must yield at least two non-empty atomic tokens in a
    // majority of rows, otherwise the delimiter is incidental punctuation.
    let splitting = texts
        .iter()
        .filter(|s| s.split(delimiter).filter(|t| !t.trim().is_empty()).count() >= 2)
        .count();
    if (splitting as f64) < fraction * non_null.len() as f64 {
        return None;
    }

    Some(MultivaluedInfo { delimiter })
}

/// Detect a decomposable structured field (address, JSON object, full name).
fn detect_structured(name: &str, non_null: &[&Value]) -> Option<StructuredField> {
    let texts: Vec<&str> = non_null
        .iter()
        .filter_map(|v| v.as_text())
        .take(50)
        .collect();
    if texts.is_empty() {
        return None;
    }

    if let Some(addr) = detect_address(name, &texts) {
        return Some(addr);
    }
    if let Some(json) = detect_json_like(&texts) {
        return Some(json);
    }
    detect_full_name(name, &texts)
}

fn detect_address(name: &str, texts: &[&str]) -> Option<StructuredField> {
    let lower = name.to_ascii_lowercase();
    let named = ["address", "addr", "location", "street"]
        .iter()
        .any(|ind| lower.contains(ind));
    if !named {
        return None;
    }

    let total = texts.len() as f64;
    let hits = |re: &Regex| texts.iter().filter(|s| re.is_match(s)).count() as f64 / total;

    let has_street = hits(&STREET_RE) > 0.5;
    let has_city = hits(&CITY_RE) > 0.3;
    let has_state = hits(&STATE_RE) > 0.3;
    let has_zip = hits(&ZIP_RE) > 0.3;

    if !(has_street || (has_city && (has_state || has_zip))) {
        return None;
    }

    let mut components = Vec::new();
    if has_street {
        components.push("street".to_string());
    }
    if has_city {
        components.push("city".to_string());
    }
    if has_state {
        components.push("state".to_string());
    }
    if has_zip {
        components.push("zip_code".to_string());
    }
    Some(StructuredField::Address(components))
}

fn detect_json_like(texts: &[&str]) -> Option<StructuredField> {
    let sample: Vec<&str> = texts.iter().copied().take(10).collect();
    let braced = sample
        .iter()
        .filter(|s| {
            let t = s.trim();
            t.starts_with('{') && t.ends_with('}')
        })
        .count();
    if (braced as f64) < 0.7 * sample.len() as f64 {
        return None;
    }

    let parsed = sample
        .iter()
        .filter(|s| serde_json::from_str::<serde_json::Value>(s).is_ok())
        .count();
    if (parsed as f64) < 0.7 * sample.len() as f64 {
        return None;
    }

    for s in texts {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(s) {
            return Some(StructuredField::JsonLike(map.keys().cloned().collect()));
        }
    }
    None
}

fn detect_full_name(name: &str, texts: &[&str]) -> Option<StructuredField> {
    let lower = name.to_ascii_lowercase();
    let named = ["name", "fullname", "full_name"]
        .iter()
        .any(|ind| lower.contains(ind));
    if !named {
        return None;
    }

    let mean_spaces = texts
        .iter()
        .map(|s| s.matches(' ').count() as f64)
        .sum::<f64>()
        / texts.len() as f64;
    if !(1.0..=3.0).contains(&mean_spaces) {
        return None;
    }

    let mut components = vec!["first_name".to_string(), "last_name".to_string()];
    if mean_spaces > 1.5 {
        components.insert(1, "middle_name".to_string());
    }
    Some(StructuredField::FullName(components))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(name: &str, column: &str, values: Vec<Value>) -> Table {
        let mut t = Table::new(name, vec![column.to_string()]);
        for v in values {
            t.push_row(vec![v]);
        }
        t
    }

    fn profile(values: Vec<Value>) -> ColumnProfile {
        let t = table_of("t", "col", values);
        profile_column(&t, "col", &ProfilingConfig::default())
    }

    #[test]
    fn test_type_precedence_boolean_before_integer() {
        let p = profile(vec!["0".into(), "1".into(), "1".into(), "0".into()]);
        assert_eq!(p.data_type, ColumnType::Boolean);

        let p = profile(vec!["0".into(), "1".into(), "2".into(), "3".into()]);
        assert_eq!(p.data_type, ColumnType::Integer);
    }

    #[test]
    fn test_type_inference_decimal_and_temporal() {
        let p = profile(vec!["1.5".into(), "2.25".into(), "3.0".into()]);
        assert_eq!(p.data_type, ColumnType::Decimal);

        let p = profile(vec!["2023-01-02".into(), "2023-05-09".into()]);
        assert_eq!(p.data_type, ColumnType::Date);

        let p = profile(vec![
            "2023-01-02T10:00:00".into(),
            "2023-05-09 11:30:00".into(),
        ]);
        assert_eq!(p.data_type, ColumnType::DateTime);
    }

    #[test]
    fn test_mixed_column_defaults_to_string() {
        let p = profile(vec!["12".into(), "hello".into(), "34".into(), "x".into()]);
        assert_eq!(p.data_type, ColumnType::String);
    }

    #[test]
    fn test_empty_column_is_string_with_zero_uniqueness() {
        let p = profile(vec![Value::Null, Value::Null]);
        assert_eq!(p.data_type, ColumnType::String);
        assert_eq!(p.uniqueness_ratio, 0.0);
        assert!(!p.key_eligible());
    }

    #[test]
    fn test_uniqueness_over_non_null_rows() {
        let p = profile(vec!["a".into(), "b".into(), Value::Null, Value::Null]);
        assert_eq!(p.non_null_count, 2);
        assert_eq!(p.uniqueness_ratio, 1.0);
        assert_eq!(p.null_ratio, 0.5);
        assert!(!p.is_unique_non_null());
    }

    #[test]
    fn test_multivalued_detection() {
        let p = profile(vec![
            "red,green".into(),
            "blue,yellow,red".into(),
            "green,blue".into(),
        ]);
        assert_eq!(p.multivalued, Some(MultivaluedInfo { delimiter: ',' }));
        assert!(p.structured.is_none());
        assert!(!p.key_eligible());
    }

    #[test]
    fn test_single_token_values_not_multivalued() {
        let p = profile(vec!["red".into(), "green".into(), "blue".into()]);
        assert!(p.multivalued.is_none());
    }

    #[test]
    fn test_full_name_detection() {
        let t = table_of(
            "people",
            "full_name",
            vec!["Ada Lovelace".into(), "Alan Turing".into()],
        );
        let p = profile_column(&t, "full_name", &ProfilingConfig::default());
        assert_eq!(
            p.structured,
            Some(StructuredField::FullName(vec![
                "first_name".into(),
                "last_name".into()
            ]))
        );
    }

    #[test]
    fn test_json_like_detection() {
        let t = table_of(
            "events",
            "payload",
            vec![
                r#"{"kind":"click","x":1}"#.into(),
                r#"{"kind":"move","x":2}"#.into(),
            ],
        );
        let p = profile_column(&t, "payload", &ProfilingConfig::default());
        match p.structured {
            Some(StructuredField::JsonLike(keys)) => {
                assert!(keys.contains(&"kind".to_string()));
            }
            other => panic!("expected json-like classification, got {:?}", other),
        }
    }

    #[test]
    fn test_address_detection() {
        let t = table_of(
            "stores",
            "address",
            vec![
                "12 Main Street, Springfield, IL 62704".into(),
                "90 Oak Avenue, Portland, OR 97202".into(),
            ],
        );
        let p = profile_column(&t, "address", &ProfilingConfig::default());
        match p.structured {
            Some(StructuredField::Address(components)) => {
                assert!(components.contains(&"street".to_string()));
            }
            other => panic!("expected address classification, got {:?}", other),
        }
    }
}
