//! Mermaid `erDiagram` rendering for the normalized schema.
//!
//! Text output only; paste into any Mermaid renderer to visualize. One block
//! per table with typed columns and PK markers, one many-to-one edge per
//! validated relationship.

use crate::core::{ForeignKey, NormalizedTable};

/// Render the schema as a Mermaid entity-relationship diagram.
pub fn render_mermaid(tables: &[NormalizedTable], relationships: &[ForeignKey]) -> String {
    let mut out: Vec<String> = vec!["erDiagram".to_string()];

    for table in tables {
        out.push(format!("    {} {{", table.name));
        for column in &table.columns {
            let marker = if table.primary_key.contains(&column.name) {
                " PK"
            } else {
                ""
            };
            out.push(format!(
                "        {} {}{}",
                column.data_type, column.name, marker
            ));
        }
        out.push("    }".to_string());
    }

    for fk in relationships {
        if fk.table == fk.ref_table {
            continue;
        }
        out.push(format!("    {} ||--o{{ {} : has", fk.ref_table, fk.table));
    }

    out.join("\n")
}
