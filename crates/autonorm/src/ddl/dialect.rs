//! SQL syntax strategy for the supported target engines.
//!
//! The renderer stays dialect-agnostic; each dialect supplies identifier
//! quoting, type rendering and its reserved-word table. Reserved words and
//! length limits are data on the dialect object, never module-level state.

use crate::core::ColumnType;

/// SQL syntax strategy for a target engine.
pub trait SqlDialect: Send + Sync {
    /// Dialect identifier (e.g. "postgres", "oracle").
    fn name(&self) -> &str;

    /// Quote an already-sanitized identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Render an inferred column type as DDL text.
    fn render_type(&self, ty: ColumnType) -> &'static str;

    /// Maximum identifier length for this engine.
    fn max_identifier_len(&self) -> usize;

    /// Whether a word cannot be used as a bare identifier.
    fn is_reserved(&self, word: &str) -> bool;
}

/// Look up a dialect by name.
pub fn dialect_for(name: &str) -> Option<Box<dyn SqlDialect>> {
    match name.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Some(Box::new(PostgresDialect)),
        "oracle" => Some(Box::new(OracleDialect)),
        _ => None,
    }
}

/// Words rejected as bare identifiers by most engines; shared baseline.
const COMMON_RESERVED: [&str; 42] = [
    "all", "alter", "and", "as", "asc", "between", "by", "check", "column", "constraint",
    "create", "default", "delete", "desc", "distinct", "drop", "else", "exists", "for", "from",
    "grant", "group", "having", "in", "index", "insert", "into", "is", "like", "not", "null",
    "on", "or", "order", "select", "set", "table", "then", "union", "update", "values", "where",
];

/// PostgreSQL: double-quoted identifiers, 63-byte limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

const POSTGRES_RESERVED: [&str; 8] = [
    "user", "when", "case", "end", "limit", "offset", "references", "primary",
];

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn render_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "bigint",
            ColumnType::Decimal => "numeric(15,2)",
            ColumnType::Date => "date",
            ColumnType::DateTime => "timestamp",
            ColumnType::String => "text",
        }
    }

    fn max_identifier_len(&self) -> usize {
        63
    }

    fn is_reserved(&self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        COMMON_RESERVED.contains(&lower.as_str()) || POSTGRES_RESERVED.contains(&lower.as_str())
    }
}

/// Oracle: unquoted uppercase-folded identifiers, 30-character limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

const ORACLE_RESERVED: [&str; 24] = [
    "access", "audit", "cluster", "comment", "compress", "date", "file", "identified",
    "increment", "initial", "level", "lock", "long", "mode", "number", "raw", "rename",
    "resource", "row", "rowid", "rownum", "session", "size", "user",
];

impl SqlDialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn quote_ident(&self, name: &str) -> String {
        name.to_string()
    }

    fn render_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Boolean => "CHAR(1)",
            ColumnType::Integer => "NUMBER(19)",
            ColumnType::Decimal => "NUMBER(15,2)",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "TIMESTAMP",
            ColumnType::String => "VARCHAR2(255)",
        }
    }

    fn max_identifier_len(&self) -> usize {
        30
    }

    fn is_reserved(&self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        COMMON_RESERVED.contains(&lower.as_str()) || ORACLE_RESERVED.contains(&lower.as_str())
    }
}
