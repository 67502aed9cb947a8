//! DDL script rendering for the normalized schema.
//!
//! Emits `CREATE TABLE` statements in dependency order (referenced tables
//! first), then `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` for every
//! validated relationship. Identifiers are sanitized per dialect: invalid
//! characters replaced, reserved words suffixed, names truncated to the
//! engine's limit and kept unique within the script.

use std::collections::{HashMap, HashSet};

use crate::core::{ForeignKey, NormalizedTable};

use super::dialect::SqlDialect;

/// Render the complete DDL script for a normalized schema.
pub fn render_ddl(
    tables: &[NormalizedTable],
    relationships: &[ForeignKey],
    dialect: &dyn SqlDialect,
) -> String {
    let ordered = dependency_order(tables, relationships);

    let mut used_tables: HashSet<String> = HashSet::new();
    let mut table_names: HashMap<String, String> = HashMap::new();
    let mut column_names: HashMap<String, HashMap<String, String>> = HashMap::new();

    for table in &ordered {
        let sanitized = sanitize(dialect, &table.name, &mut used_tables);
        table_names.insert(table.name.clone(), sanitized);

        let mut used_cols: HashSet<String> = HashSet::new();
        let cols = table
            .columns
            .iter()
            .map(|c| (c.name.clone(), sanitize(dialect, &c.name, &mut used_cols)))
            .collect();
        column_names.insert(table.name.clone(), cols);
    }

    let mut out: Vec<String> = vec![
        "-- Auto-generated 3NF normalized schema".to_string(),
        format!("-- Dialect: {}", dialect.name()),
        String::new(),
    ];

    for table in &ordered {
        let table_ident = dialect.quote_ident(&table_names[&table.name]);
        let cols = &column_names[&table.name];

        out.push(format!("-- Source table: {}", table.origin));
        out.push(format!("CREATE TABLE {} (", table_ident));

        let mut lines: Vec<String> = Vec::new();
        for column in &table.columns {
            let not_null = if table.primary_key.contains(&column.name) {
                " NOT NULL"
            } else {
                ""
            };
            lines.push(format!(
                "    {} {}{}",
                dialect.quote_ident(&cols[&column.name]),
                dialect.render_type(column.data_type),
                not_null
            ));
        }
        if !table.primary_key.is_empty() {
            let mut used = used_tables.clone();
            let constraint =
                sanitize(dialect, &format!("pk_{}", table_names[&table.name]), &mut used);
            let key_cols: Vec<String> = table
                .primary_key
                .iter()
                .filter_map(|c| cols.get(c))
                .map(|c| dialect.quote_ident(c))
                .collect();
            lines.push(format!(
                "    CONSTRAINT {} PRIMARY KEY ({})",
                constraint,
                key_cols.join(", ")
            ));
        }
        out.push(lines.join(",\n"));
        out.push(");".to_string());
        out.push(String::new());
    }

    let mut constraint_names: HashSet<String> = HashSet::new();
    let mut counter = 1;
    for fk in relationships {
        let (source, target) = match (table_names.get(&fk.table), table_names.get(&fk.ref_table)) {
            (Some(s), Some(t)) => (s, t),
            _ => continue,
        };
        let source_col = column_names.get(&fk.table).and_then(|c| c.get(&fk.column));
        let target_col = column_names
            .get(&fk.ref_table)
            .and_then(|c| c.get(&fk.ref_column));
        let (source_col, target_col) = match (source_col, target_col) {
            (Some(s), Some(t)) => (s, t),
            _ => continue,
        };

        let constraint = sanitize(
            dialect,
            &format!("fk_{}_{}", source, counter),
            &mut constraint_names,
        );
        out.push(format!(
            "ALTER TABLE {}\n    ADD CONSTRAINT {}\n    FOREIGN KEY ({})\n    REFERENCES {} ({});",
            dialect.quote_ident(source),
            constraint,
            dialect.quote_ident(source_col),
            dialect.quote_ident(target),
            dialect.quote_ident(target_col)
        ));
        out.push(String::new());
        counter += 1;
    }

    out.join("\n")
}

/// Order tables so that every relationship target precedes its source.
/// A cycle (should not survive validation) falls back to input order.
fn dependency_order<'a>(
    tables: &'a [NormalizedTable],
    relationships: &[ForeignKey],
) -> Vec<&'a NormalizedTable> {
    let mut ordered: Vec<&NormalizedTable> = Vec::with_capacity(tables.len());
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&NormalizedTable> = tables.iter().collect();

    while !remaining.is_empty() {
        let (ready, rest): (Vec<&NormalizedTable>, Vec<&NormalizedTable>) =
            remaining.into_iter().partition(|table| {
                relationships.iter().all(|fk| {
                    fk.table != table.name
                        || fk.ref_table == table.name
                        || emitted.contains(fk.ref_table.as_str())
                })
            });
        if ready.is_empty() {
            ordered.extend(rest);
            break;
        }
        for table in ready {
            emitted.insert(table.name.as_str());
            ordered.push(table);
        }
        remaining = rest;
    }
    ordered
}

/// Sanitize one identifier for the dialect, keeping it unique within `used`.
fn sanitize(dialect: &dyn SqlDialect, name: &str, used: &mut HashSet<String>) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }
    if !sanitized.chars().next().map_or(false, |c| c.is_ascii_alphabetic()) {
        sanitized = format!("col_{}", sanitized);
    }
    if dialect.is_reserved(&sanitized) {
        sanitized = format!("{}_col", sanitized);
    }

    let max = dialect.max_identifier_len();
    if sanitized.len() > max {
        sanitized.truncate(max);
        sanitized = sanitized.trim_end_matches('_').to_string();
    }

    if used.insert(sanitized.clone()) {
        return sanitized;
    }
    let mut counter = 2;
    loop {
        let suffix = format!("_{}", counter);
        let mut candidate = sanitized.clone();
        candidate.truncate(max.saturating_sub(suffix.len()));
        let candidate = format!("{}{}", candidate.trim_end_matches('_'), suffix);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnRole, ColumnType, OutputColumn};
    use crate::ddl::dialect::{OracleDialect, PostgresDialect};

    fn column(name: &str, ty: ColumnType) -> OutputColumn {
        OutputColumn {
            name: name.into(),
            role: ColumnRole::OwnAttribute,
            data_type: ty,
            source: None,
        }
    }

    fn normalized(name: &str, columns: Vec<OutputColumn>, pk: &[&str]) -> NormalizedTable {
        NormalizedTable {
            name: name.into(),
            origin: name.into(),
            columns,
            rows: Vec::new(),
            primary_key: pk.iter().map(|c| c.to_string()).collect(),
            foreign_keys: Vec::new(),
        }
    }

    fn schema() -> (Vec<NormalizedTable>, Vec<ForeignKey>) {
        let customers = normalized(
            "customers",
            vec![
                column("customer_id", ColumnType::Integer),
                column("city", ColumnType::String),
            ],
            &["customer_id"],
        );
        let orders = normalized(
            "orders",
            vec![
                column("order_id", ColumnType::Integer),
                column("customer_id", ColumnType::Integer),
                column("order_date", ColumnType::Date),
            ],
            &["order_id"],
        );
        let fks = vec![ForeignKey {
            table: "orders".into(),
            column: "customer_id".into(),
            ref_table: "customers".into(),
            ref_column: "customer_id".into(),
            evidence: vec![],
        }];
        (vec![orders, customers], fks)
    }

    #[test]
    fn test_postgres_script_shape() {
        let (tables, fks) = schema();
        let ddl = render_ddl(&tables, &fks, &PostgresDialect);

        assert!(ddl.contains("CREATE TABLE \"customers\""));
        assert!(ddl.contains("\"customer_id\" bigint NOT NULL"));
        assert!(ddl.contains("CONSTRAINT pk_customers PRIMARY KEY (\"customer_id\")"));
        assert!(ddl.contains("ADD CONSTRAINT fk_orders_1"));
        assert!(ddl.contains("REFERENCES \"customers\" (\"customer_id\")"));

        // Referenced table renders before the referencing one.
        let customers_at = ddl.find("CREATE TABLE \"customers\"").unwrap();
        let orders_at = ddl.find("CREATE TABLE \"orders\"").unwrap();
        assert!(customers_at < orders_at);
    }

    #[test]
    fn test_oracle_types_and_no_quoting() {
        let (tables, fks) = schema();
        let ddl = render_ddl(&tables, &fks, &OracleDialect);
        assert!(ddl.contains("CREATE TABLE customers ("));
        assert!(ddl.contains("customer_id NUMBER(19) NOT NULL"));
        assert!(ddl.contains("order_date DATE"));
    }

    #[test]
    fn test_reserved_word_column_suffixed() {
        let t = normalized(
            "lines",
            vec![
                column("line_id", ColumnType::Integer),
                column("order", ColumnType::Integer),
            ],
            &["line_id"],
        );
        let ddl = render_ddl(&[t], &[], &PostgresDialect);
        assert!(ddl.contains("\"order_col\""));
        assert!(!ddl.contains("\"order\" "));
    }

    #[test]
    fn test_long_identifier_truncated_for_oracle() {
        let long = "a_very_long_table_name_that_exceeds_the_oracle_limit";
        let t = normalized(long, vec![column("item_id", ColumnType::Integer)], &["item_id"]);
        let ddl = render_ddl(&[t], &[], &OracleDialect);
        for line in ddl.lines() {
            if let Some(rest) = line.strip_prefix("CREATE TABLE ") {
                let name = rest.trim_end_matches(" (");
                assert!(name.len() <= 30, "identifier too long: {}", name);
            }
        }
    }

    #[test]
    fn test_sanitize_collision() {
        let mut used = HashSet::new();
        let a = sanitize(&PostgresDialect, "weird name", &mut used);
        let b = sanitize(&PostgresDialect, "weird-name", &mut used);
        assert_eq!(a, "weird_name");
        assert_eq!(b, "weird_name_2");
    }
}
