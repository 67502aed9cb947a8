//! Pipeline orchestrator - runs the normalization stages in order.
//!
//! Per-table work (profiling, key selection, synthesis) runs to completion
//! for each input table; cross-table foreign-key detection and schema
//! verification run afterwards over the synthesized set. Recoverable
//! per-table failures mark that table failed and continue; an
//! attribute-preservation violation aborts only the affected table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info};

use crate::config::Config;
use crate::core::{
    CandidateKind, ForeignKey, NormalizedTable, OutputColumn, RejectedCandidate,
    SkippedRelationship, Table,
};
use crate::error::NormalizeError;
use crate::fk::detect_foreign_keys;
use crate::keys::singular_forms;
use crate::profile::profile_columns;
use crate::synth::{SynthTable, Synthesizer};
use crate::verify::{verify_schema, SchemaReport};

/// Normalization pipeline runner.
pub struct Pipeline {
    config: Config,
}

/// Per-table outcome for the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatus {
    /// Input table name.
    pub table: String,

    /// "normalized" or "failed".
    pub status: String,

    /// Failure message, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Number of output tables this input produced.
    pub tables_out: usize,
}

/// Result of a normalization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: "success", "completed_with_failures" or "failed".
    pub status: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Input tables received.
    pub tables_in: usize,

    /// Normalized tables produced.
    pub tables_out: usize,

    /// Foreign keys accepted by detection and validation.
    pub foreign_keys_accepted: usize,

    /// Foreign-key candidates skipped, each with a reason.
    pub foreign_keys_skipped: usize,

    /// Original attributes accounted for across the output.
    pub attributes_preserved: usize,

    /// Original attributes lost (must be zero; non-zero fails the run).
    pub attributes_lost: usize,

    /// Input tables that failed.
    pub failed_tables: Vec<String>,

    /// Per-table outcomes.
    pub table_statuses: Vec<TableStatus>,

    /// The normalized table set.
    pub tables: Vec<NormalizedTable>,

    /// Validated relationship list.
    pub relationships: Vec<ForeignKey>,

    /// Relationship candidates that were not materialized, with reasons.
    pub skipped_relationships: Vec<SkippedRelationship>,

    /// Every rejected candidate (entity, pattern, key, foreign key).
    pub rejections: Vec<RejectedCandidate>,

    /// Post-synthesis verification outcome.
    pub verification: SchemaReport,
}

impl Pipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the full normalization over a set of input tables.
    pub fn run(&self, inputs: Vec<Table>) -> RunResult {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(run_id = run_id.as_str(), tables = inputs.len(), "starting normalization run");

        let mut synthesizer = Synthesizer::new(&self.config);
        let mut synthesized: Vec<SynthTable> = Vec::new();
        let mut table_statuses: Vec<TableStatus> = Vec::new();
        let mut failed_tables: Vec<String> = Vec::new();
        let mut attributes_preserved = 0usize;
        let mut attributes_lost = 0usize;

        info!("Phase 1: profiling and synthesizing {} tables", inputs.len());
        for input in &inputs {
            let hints = fk_hints(input, &inputs);
            match synthesizer.synthesize(input, &hints) {
                Ok(tables) => {
                    attributes_preserved += input.column_count();
                    table_statuses.push(TableStatus {
                        table: input.name.clone(),
                        status: "normalized".to_string(),
                        message: None,
                        tables_out: tables.len(),
                    });
                    synthesized.extend(tables);
                }
                Err(err) => {
                    if let NormalizeError::AttributeLoss { ref columns, .. } = err {
                        attributes_lost += columns.len();
                    }
                    error!(
                        table = input.name.as_str(),
                        error = %err,
                        "table failed, continuing with remaining tables"
                    );
                    failed_tables.push(input.name.clone());
                    table_statuses.push(TableStatus {
                        table: input.name.clone(),
                        status: "failed".to_string(),
                        message: Some(err.to_string()),
                        tables_out: 0,
                    });
                }
            }
        }

        info!("Phase 2: detecting foreign keys across {} tables", synthesized.len());
        let outcome = detect_foreign_keys(&synthesized, &self.config.foreign_keys);
        for table in &mut synthesized {
            table.foreign_keys = outcome
                .accepted
                .iter()
                .filter(|fk| fk.table == table.table.name)
                .cloned()
                .collect();
        }

        let mut skipped_relationships = std::mem::take(&mut synthesizer.skipped);
        skipped_relationships.extend(outcome.skipped);

        let mut rejections = std::mem::take(&mut synthesizer.rejections);
        rejections.extend(skipped_relationships.iter().map(|s| RejectedCandidate {
            kind: CandidateKind::ForeignKey,
            table: s.table.clone(),
            subject: format!("{} → {}.{}", s.column, s.ref_table, s.ref_column),
            evidence: vec![s.reason.clone()],
        }));

        info!("Phase 3: verifying synthesized schema");
        let verification = verify_schema(&synthesized, &outcome.accepted);

        info!("Phase 4: assembling run result");
        let tables: Vec<NormalizedTable> = synthesized
            .iter()
            .map(|t| self.to_normalized(t))
            .collect();

        let completed_at = Utc::now();
        let status = if attributes_lost > 0 || (!failed_tables.is_empty() && tables.is_empty()) {
            "failed"
        } else if !failed_tables.is_empty() || !verification.passed() {
            "completed_with_failures"
        } else {
            "success"
        };

        info!(
            run_id = run_id.as_str(),
            status,
            tables_in = inputs.len(),
            tables_out = tables.len(),
            foreign_keys = outcome.accepted.len(),
            skipped = skipped_relationships.len(),
            "normalization run complete"
        );

        RunResult {
            run_id,
            status: status.to_string(),
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            tables_in: inputs.len(),
            tables_out: tables.len(),
            foreign_keys_accepted: outcome.accepted.len(),
            foreign_keys_skipped: skipped_relationships.len(),
            attributes_preserved,
            attributes_lost,
            failed_tables,
            table_statuses,
            tables,
            relationships: outcome.accepted,
            skipped_relationships,
            rejections,
            verification,
        }
    }

    /// Resolve column roles, provenance and inferred types into the output
    /// contract.
    fn to_normalized(&self, synth: &SynthTable) -> NormalizedTable {
        let profiles = profile_columns(&synth.table, &self.config.profiling);
        let columns = synth
            .table
            .columns
            .iter()
            .map(|name| {
                let data_type = profiles
                    .iter()
                    .find(|p| &p.name == name)
                    .map(|p| p.data_type)
                    .unwrap_or(crate::core::ColumnType::String);
                let source = synth
                    .provenance
                    .get(name)
                    .filter(|orig| *orig != name)
                    .cloned();
                OutputColumn {
                    name: name.clone(),
                    role: synth.role(name),
                    data_type,
                    source,
                }
            })
            .collect();

        NormalizedTable {
            name: synth.table.name.clone(),
            origin: synth.origin.clone(),
            columns,
            rows: synth.table.rows.clone(),
            primary_key: synth.primary_key.clone(),
            foreign_keys: synth.foreign_keys.clone(),
        }
    }
}

/// Hint columns likely to be foreign keys before detection proper: a
/// `{stem}_id` column whose stem matches another input table's name.
fn fk_hints(table: &Table, all: &[Table]) -> HashSet<String> {
    let mut hints = HashSet::new();
    for col in &table.columns {
        let lower = col.to_ascii_lowercase();
        let stem = match lower.strip_suffix("_id") {
            Some(s) => s,
            None => continue,
        };
        for other in all {
            if other.name == table.name {
                continue;
            }
            if singular_forms(&other.name.to_ascii_lowercase())
                .iter()
                .any(|f| f == stem)
            {
                hints.insert(col.clone());
            }
        }
    }
    hints
}
