//! Table synthesis: the 1NF → 2NF → 3NF rewrite.
//!
//! The synthesizer is the sole mutator of the evolving table set. Each input
//! table is processed over an explicit worklist: multivalued and structured
//! columns split off first (1NF), partial dependencies next (2NF), then
//! promoted entity candidates and multi-row patterns (3NF). Newly created
//! tables re-enter the worklist, but a table is never synthesized from
//! twice, so the fixed point terminates.
//!
//! After every stage the attribute-preservation invariant is re-checked:
//! each original column must have exactly one own-attribute home across the
//! working set, with derived columns (exploded values, decomposed
//! components) mapped back through their provenance. A violation is a bug in
//! the rewrite and fails the affected table loudly.

mod decompose;

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::classify::{classify_multi_row, score_entity};
use crate::config::Config;
use crate::core::{
    CandidateKind, ColumnRole, ForeignKey, MultiRowPattern, RejectedCandidate,
    SkippedRelationship, Table, Value,
};
use crate::error::{NormalizeError, Result};
use crate::keys::{
    find_presumptive_key, select_primary_key, surrogate_key_name, KeyKind, KeySelection,
};
use crate::profile::{
    find_candidate_keys, joint_unique_non_null, profile_columns, profile_dependencies,
    StructuredField,
};

use decompose::{decompose_cell, explode_cell};

/// Column-name tokens that mark a location concept, used when naming an
/// extracted entity table.
const LOCATION_TOKENS: [&str; 10] = [
    "city", "state", "country", "zip", "postal", "region", "province", "location", "address",
    "street",
];

/// One synthesized table with its key, roles and outbound links.
#[derive(Debug, Clone)]
pub struct SynthTable {
    /// The table data.
    pub table: Table,

    /// Input table this one traces to.
    pub origin: String,

    /// Primary key columns.
    pub primary_key: Vec<String>,

    /// Natural or surrogate key.
    pub key_kind: KeyKind,

    /// Why the key was chosen.
    pub key_reason: String,

    /// Per-column roles; columns absent from the map are own attributes.
    pub roles: HashMap<String, ColumnRole>,

    /// Derived column → original input column.
    pub provenance: HashMap<String, String>,

    /// Outbound foreign keys recorded during synthesis.
    pub foreign_keys: Vec<ForeignKey>,
}

impl SynthTable {
    /// Role of a column, defaulting to own-attribute.
    #[must_use]
    pub fn role(&self, column: &str) -> ColumnRole {
        self.roles
            .get(column)
            .copied()
            .unwrap_or(ColumnRole::OwnAttribute)
    }
}

/// Worklist entry: a table pending normalization.
#[derive(Debug, Clone)]
struct WorkItem {
    table: Table,
    preset_key: Option<KeySelection>,
    roles: HashMap<String, ColumnRole>,
    provenance: HashMap<String, String>,
    foreign_keys: Vec<ForeignKey>,
}

impl WorkItem {
    fn role(&self, column: &str) -> ColumnRole {
        self.roles
            .get(column)
            .copied()
            .unwrap_or(ColumnRole::OwnAttribute)
    }
}

/// Executes the 1NF→2NF→3NF rewrite for one input table at a time.
pub struct Synthesizer<'a> {
    config: &'a Config,

    /// Every rejected candidate, with evidence, for the run report.
    pub rejections: Vec<RejectedCandidate>,

    /// Relationships synthesis could not materialize (composite targets).
    pub skipped: Vec<SkippedRelationship>,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer with the given configuration.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            rejections: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Rewrite one input table into its normalized table set.
    pub fn synthesize(
        &mut self,
        input: &Table,
        fk_hints: &HashSet<String>,
    ) -> Result<Vec<SynthTable>> {
        if input.is_structurally_empty() {
            return Err(NormalizeError::input(
                input.name.clone(),
                "table has no columns or no rows",
            ));
        }

        let original_columns = input.columns.clone();
        let mut used_names: HashSet<String> = HashSet::new();
        used_names.insert(input.name.clone());

        let mut queue: VecDeque<WorkItem> = VecDeque::new();
        queue.push_back(WorkItem {
            table: input.clone(),
            preset_key: None,
            roles: HashMap::new(),
            provenance: HashMap::new(),
            foreign_keys: Vec::new(),
        });

        let mut done: HashSet<String> = HashSet::new();
        let mut results: Vec<SynthTable> = Vec::new();

        while let Some(item) = queue.pop_front() {
            // A table, once synthesized from, is never re-entered.
            if !done.insert(item.table.name.clone()) {
                continue;
            }
            let hints = if item.table.name == input.name {
                fk_hints.clone()
            } else {
                HashSet::new()
            };
            self.process_item(
                item,
                &hints,
                &mut queue,
                &mut results,
                &original_columns,
                &input.name,
                &mut used_names,
            )?;
        }

        check_preservation(&input.name, &original_columns, &results, &queue, &[], None)?;
        self.dedup_rejections();
        Ok(results)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_item(
        &mut self,
        mut item: WorkItem,
        fk_hints: &HashSet<String>,
        queue: &mut VecDeque<WorkItem>,
        results: &mut Vec<SynthTable>,
        original_columns: &[String],
        origin: &str,
        used_names: &mut HashSet<String>,
    ) -> Result<()> {
        let mut children: Vec<WorkItem> = Vec::new();
        let mut profiles = profile_columns(&item.table, &self.config.profiling);

        // ----- key determination -----
        let key = if let Some(preset) = item.preset_key.take() {
            preset
        } else {
            let singles = select_primary_key(&item.table, &profiles, &[], fk_hints);
            for r in singles.rejected {
                self.rejections.push(r);
            }
            if singles.selection.kind == KeyKind::Natural {
                singles.selection
            } else if let Some(presumptive) = find_presumptive_key(&item.table, &profiles) {
                let key = self.split_multi_row(&mut item, &presumptive, &mut children, used_names);
                profiles = profile_columns(&item.table, &self.config.profiling);
                key
            } else {
                let candidates = find_candidate_keys(&item.table, &profiles, &self.config.profiling);
                let composite = select_primary_key(&item.table, &profiles, &candidates, fk_hints);
                if composite.selection.kind == KeyKind::Natural {
                    composite.selection
                } else {
                    let surrogate = composite.selection.columns[0].clone();
                    let values: Vec<Value> =
                        (1..=item.table.row_count() as i64).map(Value::Int).collect();
                    item.table.insert_column_front(surrogate.clone(), values);
                    item.roles.insert(surrogate.clone(), ColumnRole::Surrogate);
                    info!(
                        table = item.table.name.as_str(),
                        surrogate = surrogate.as_str(),
                        reason = composite.selection.reason.as_str(),
                        "added surrogate key"
                    );
                    composite.selection
                }
            }
        };
        let pk = key.columns.clone();

        // ----- 1NF: repeating groups and structured fields -----
        self.first_normal_form(&mut item, &pk, &mut children, used_names);
        check_preservation(origin, original_columns, results, queue, &children, Some(&item))?;

        // ----- 2NF: partial dependencies (composite keys only) -----
        self.second_normal_form(&mut item, &pk, &mut children, used_names);
        check_preservation(origin, original_columns, results, queue, &children, Some(&item))?;

        // ----- 3NF: transitive chains through promoted entities -----
        self.third_normal_form(&mut item, &pk, &mut children, used_names);
        check_preservation(origin, original_columns, results, queue, &children, Some(&item))?;

        queue.extend(children);
        results.push(SynthTable {
            table: item.table,
            origin: origin.to_string(),
            primary_key: pk,
            key_kind: key.kind,
            key_reason: key.reason,
            roles: item.roles,
            provenance: item.provenance,
            foreign_keys: item.foreign_keys,
        });
        Ok(())
    }

    /// Split a table whose presumptive key repeats into parent + child.
    fn split_multi_row(
        &mut self,
        item: &mut WorkItem,
        presumptive: &str,
        children: &mut Vec<WorkItem>,
        used_names: &mut HashSet<String>,
    ) -> KeySelection {
        let pattern = classify_multi_row(&item.table, presumptive);
        if pattern.pattern == MultiRowPattern::None {
            // Presumptive keys always carry duplicates; treat as plain parent.
            return KeySelection::natural(
                vec![presumptive.to_string()],
                "presumptive key without duplicates",
            );
        }

        info!(
            table = item.table.name.as_str(),
            key = presumptive,
            pattern = ?pattern.pattern,
            evidence = pattern.evidence.join("; ").as_str(),
            "multi-row pattern, splitting child table"
        );

        let child_base = format!("{}_{}", item.table.name, pattern.pattern.table_suffix());
        let child_name = unique_name(used_names, child_base);

        let mut child_cols = vec![presumptive.to_string()];
        child_cols.extend(pattern.varying_columns.iter().cloned());
        let mut child_table = item.table.project(child_name.clone(), &child_cols);
        child_table.dedup_rows();

        let mut child_roles: HashMap<String, ColumnRole> = HashMap::new();
        child_roles.insert(presumptive.to_string(), ColumnRole::InheritedKey);
        let mut child_provenance = HashMap::new();
        for col in &pattern.varying_columns {
            if let Some(orig) = item.provenance.get(col) {
                child_provenance.insert(col.clone(), orig.clone());
            }
        }

        let preset = match &pattern.discriminator {
            Some(d)
                if joint_unique_non_null(
                    &child_table,
                    &[presumptive.to_string(), d.clone()],
                ) =>
            {
                KeySelection::natural(
                    vec![presumptive.to_string(), d.clone()],
                    format!("child rows keyed by parent key and {}", d),
                )
            }
            _ => {
                let surrogate = surrogate_key_name(&child_name, &child_table.columns);
                let values: Vec<Value> =
                    (1..=child_table.row_count() as i64).map(Value::Int).collect();
                child_table.insert_column_front(surrogate.clone(), values);
                child_roles.insert(surrogate.clone(), ColumnRole::Surrogate);
                KeySelection {
                    kind: KeyKind::Surrogate,
                    columns: vec![surrogate],
                    reason: "child table with repeating parent key".to_string(),
                }
            }
        };

        let child_fk = ForeignKey {
            table: child_name,
            column: presumptive.to_string(),
            ref_table: item.table.name.clone(),
            ref_column: presumptive.to_string(),
            evidence: vec![format!("{:?} rows reference parent key", pattern.pattern)],
        };

        children.push(WorkItem {
            table: child_table,
            preset_key: Some(preset),
            roles: child_roles,
            provenance: child_provenance,
            foreign_keys: vec![child_fk],
        });

        // The parent keeps the key and its functionally stable attributes,
        // deduplicated down to one row per key value.
        let mut parent_cols = vec![presumptive.to_string()];
        parent_cols.extend(pattern.stable_columns.iter().cloned());
        let mut parent = item.table.project(item.table.name.clone(), &parent_cols);
        parent.dedup_rows();
        item.table = parent;
        item.roles.retain(|c, _| parent_cols.contains(c));
        item.provenance.retain(|c, _| parent_cols.contains(c));

        KeySelection::natural(
            vec![presumptive.to_string()],
            format!(
                "presumptive key unique after {} split",
                pattern.pattern.table_suffix()
            ),
        )
    }

    /// 1NF: explode multivalued columns, decompose structured columns.
    fn first_normal_form(
        &mut self,
        item: &mut WorkItem,
        pk: &[String],
        children: &mut Vec<WorkItem>,
        used_names: &mut HashSet<String>,
    ) {
        let profiles = profile_columns(&item.table, &self.config.profiling);
        for profile in profiles {
            if pk.contains(&profile.name) {
                continue;
            }
            if let Some(mv) = profile.multivalued {
                self.explode_column(item, pk, &profile.name, mv.delimiter, children, used_names);
            } else if let Some(structured) = profile.structured {
                self.decompose_column(item, pk, &profile.name, &structured, children, used_names);
            }
        }
    }

    fn explode_column(
        &mut self,
        item: &mut WorkItem,
        pk: &[String],
        column: &str,
        delimiter: char,
        children: &mut Vec<WorkItem>,
        used_names: &mut HashSet<String>,
    ) {
        let child_name = unique_name(used_names, format!("{}_{}", item.table.name, column));
        let value_col = format!("{}_value", column);
        let position_col = "position".to_string();

        let pk_indices: Vec<usize> = pk
            .iter()
            .filter_map(|c| item.table.column_index(c))
            .collect();
        let col_idx = match item.table.column_index(column) {
            Some(i) => i,
            None => return,
        };

        let mut columns: Vec<String> = pk.to_vec();
        columns.push(position_col.clone());
        columns.push(value_col.clone());
        let mut child_table = Table::new(child_name.clone(), columns);
        for row in &item.table.rows {
            let tokens = explode_cell(&row[col_idx], delimiter);
            for (i, token) in tokens.into_iter().enumerate() {
                let mut child_row: Vec<Value> =
                    pk_indices.iter().map(|&idx| row[idx].clone()).collect();
                child_row.push(Value::Int(i as i64 + 1));
                child_row.push(Value::Text(token));
                child_table.push_row(child_row);
            }
        }

        info!(
            table = item.table.name.as_str(),
            column,
            child = child_name.as_str(),
            rows = child_table.row_count(),
            "exploded multivalued column"
        );

        let mut roles: HashMap<String, ColumnRole> = HashMap::new();
        for k in pk {
            roles.insert(k.clone(), ColumnRole::InheritedKey);
        }
        roles.insert(position_col.clone(), ColumnRole::Surrogate);
        let mut provenance = HashMap::new();
        let source = item
            .provenance
            .get(column)
            .cloned()
            .unwrap_or_else(|| column.to_string());
        provenance.insert(value_col, source);

        let mut key_cols: Vec<String> = pk.to_vec();
        key_cols.push(position_col);
        children.push(WorkItem {
            table: child_table,
            preset_key: Some(KeySelection::natural(
                key_cols,
                "exploded values keyed by parent key and position",
            )),
            roles,
            provenance,
            foreign_keys: self.link_to_parent(&child_name, pk, &item.table.name),
        });

        item.table.remove_column(column);
        item.roles.remove(column);
        item.provenance.remove(column);
    }

    fn decompose_column(
        &mut self,
        item: &mut WorkItem,
        pk: &[String],
        column: &str,
        structured: &StructuredField,
        children: &mut Vec<WorkItem>,
        used_names: &mut HashSet<String>,
    ) {
        let child_name = unique_name(used_names, format!("{}_{}", item.table.name, column));
        let components = structured.components().to_vec();

        let pk_indices: Vec<usize> = pk
            .iter()
            .filter_map(|c| item.table.column_index(c))
            .collect();
        let col_idx = match item.table.column_index(column) {
            Some(i) => i,
            None => return,
        };

        let mut columns: Vec<String> = pk.to_vec();
        columns.extend(components.iter().cloned());
        let mut child_table = Table::new(child_name.clone(), columns);
        for row in &item.table.rows {
            let mut child_row: Vec<Value> =
                pk_indices.iter().map(|&idx| row[idx].clone()).collect();
            child_row.extend(decompose_cell(&row[col_idx], structured));
            child_table.push_row(child_row);
        }

        info!(
            table = item.table.name.as_str(),
            column,
            child = child_name.as_str(),
            components = components.join(", ").as_str(),
            "decomposed structured column"
        );

        let mut roles: HashMap<String, ColumnRole> = HashMap::new();
        for k in pk {
            roles.insert(k.clone(), ColumnRole::InheritedKey);
        }
        let source = item
            .provenance
            .get(column)
            .cloned()
            .unwrap_or_else(|| column.to_string());
        let mut provenance = HashMap::new();
        for component in &components {
            provenance.insert(component.clone(), source.clone());
        }

        children.push(WorkItem {
            table: child_table,
            preset_key: Some(KeySelection::natural(
                pk.to_vec(),
                "decomposed components keyed by parent key",
            )),
            roles,
            provenance,
            foreign_keys: self.link_to_parent(&child_name, pk, &item.table.name),
        });

        item.table.remove_column(column);
        item.roles.remove(column);
        item.provenance.remove(column);
    }

    /// 2NF: move attributes hanging off a proper subset of a composite key.
    fn second_normal_form(
        &mut self,
        item: &mut WorkItem,
        pk: &[String],
        children: &mut Vec<WorkItem>,
        used_names: &mut HashSet<String>,
    ) {
        if pk.len() < 2 {
            return;
        }
        let profiles = profile_columns(&item.table, &self.config.profiling);
        let deps = profile_dependencies(&item.table, &profiles, pk, &self.config.profiling);

        let mut moved: HashSet<String> = HashSet::new();
        for partial in deps.partial_dependencies {
            let dependents: Vec<String> = partial
                .dependents
                .iter()
                .filter(|d| !moved.contains(*d))
                .cloned()
                .collect();
            if dependents.is_empty() {
                continue;
            }

            let child_name = unique_name(
                used_names,
                format!("{}_{}", item.table.name, partial.determinant.join("_")),
            );
            let mut cols = partial.determinant.clone();
            cols.extend(dependents.iter().cloned());
            let mut child_table = item.table.project(child_name.clone(), &cols);
            child_table.dedup_rows();

            info!(
                table = item.table.name.as_str(),
                determinant = partial.determinant.join(", ").as_str(),
                dependents = dependents.join(", ").as_str(),
                child = child_name.as_str(),
                "resolved partial dependency"
            );

            let mut roles: HashMap<String, ColumnRole> = HashMap::new();
            for k in &partial.determinant {
                roles.insert(k.clone(), ColumnRole::InheritedKey);
            }
            let mut provenance = HashMap::new();
            for d in &dependents {
                if let Some(orig) = item.provenance.get(d) {
                    provenance.insert(d.clone(), orig.clone());
                }
            }

            children.push(WorkItem {
                table: child_table,
                preset_key: Some(KeySelection::natural(
                    partial.determinant.clone(),
                    "determining subset of the composite key",
                )),
                roles,
                provenance,
                foreign_keys: Vec::new(),
            });

            if partial.determinant.len() == 1 {
                item.foreign_keys.push(ForeignKey {
                    table: item.table.name.clone(),
                    column: partial.determinant[0].clone(),
                    ref_table: child_name,
                    ref_column: partial.determinant[0].clone(),
                    evidence: vec!["partial dependency extraction".to_string()],
                });
            } else {
                self.skipped.push(SkippedRelationship {
                    table: item.table.name.clone(),
                    column: partial.determinant.join("+"),
                    ref_table: child_name,
                    ref_column: partial.determinant.join("+"),
                    reason: "composite key target".to_string(),
                });
            }

            for d in &dependents {
                item.table.remove_column(d);
                item.roles.remove(d);
                item.provenance.remove(d);
                moved.insert(d.clone());
            }
        }
    }

    /// 3NF: extract promoted entity candidates behind transitive chains.
    fn third_normal_form(
        &mut self,
        item: &mut WorkItem,
        pk: &[String],
        children: &mut Vec<WorkItem>,
        used_names: &mut HashSet<String>,
    ) {
        let profiles = profile_columns(&item.table, &self.config.profiling);
        let deps = profile_dependencies(&item.table, &profiles, pk, &self.config.profiling);

        for chain in deps.transitive_dependencies {
            let score = score_entity(
                &item.table,
                &chain.intermediate,
                &chain.dependents,
                &self.config.entity,
            );
            if !score.promoted {
                debug!(
                    table = item.table.name.as_str(),
                    intermediate = chain.intermediate.as_str(),
                    evidence = score.evidence.join("; ").as_str(),
                    "entity candidate rejected, attributes stay inline"
                );
                self.rejections.push(RejectedCandidate {
                    kind: CandidateKind::Entity,
                    table: item.table.name.clone(),
                    subject: chain.intermediate.clone(),
                    evidence: score.evidence,
                });
                continue;
            }

            let child_name = unique_name(
                used_names,
                entity_table_name(&item.table.name, &chain.intermediate, &score.stable_attributes),
            );
            let mut cols = vec![chain.intermediate.clone()];
            cols.extend(score.stable_attributes.iter().cloned());
            let mut child_table = item.table.project(child_name.clone(), &cols);
            child_table.dedup_rows();

            info!(
                table = item.table.name.as_str(),
                intermediate = chain.intermediate.as_str(),
                child = child_name.as_str(),
                confidence = score.confidence,
                class = ?score.class,
                "promoted entity candidate to its own table"
            );

            // Key the entity table with the same selection rules, falling
            // back to a surrogate when the intermediate lacks identity
            // semantics (it then stays a unique candidate for FK targeting).
            let child_profiles = profile_columns(&child_table, &self.config.profiling);
            let decision =
                select_primary_key(&child_table, &child_profiles, &[], &HashSet::new());
            let mut child_roles: HashMap<String, ColumnRole> = HashMap::new();
            child_roles.insert(chain.intermediate.clone(), ColumnRole::InheritedKey);
            let preset = if decision.selection.kind == KeyKind::Natural {
                decision.selection
            } else {
                let surrogate = surrogate_key_name(&child_name, &child_table.columns);
                let values: Vec<Value> =
                    (1..=child_table.row_count() as i64).map(Value::Int).collect();
                child_table.insert_column_front(surrogate.clone(), values);
                child_roles.insert(surrogate.clone(), ColumnRole::Surrogate);
                KeySelection {
                    kind: KeyKind::Surrogate,
                    columns: vec![surrogate],
                    reason: "entity keyed by surrogate, intermediate stays unique".to_string(),
                }
            };

            let mut child_provenance = HashMap::new();
            for a in &score.stable_attributes {
                if let Some(orig) = item.provenance.get(a) {
                    child_provenance.insert(a.clone(), orig.clone());
                }
            }

            children.push(WorkItem {
                table: child_table,
                preset_key: Some(preset),
                roles: child_roles,
                provenance: child_provenance,
                foreign_keys: Vec::new(),
            });

            item.foreign_keys.push(ForeignKey {
                table: item.table.name.clone(),
                column: chain.intermediate.clone(),
                ref_table: child_name,
                ref_column: chain.intermediate.clone(),
                evidence: vec![format!(
                    "transitive chain {} → {} → {}",
                    pk.join("+"),
                    chain.intermediate,
                    score.stable_attributes.join(", ")
                )],
            });

            for a in &score.stable_attributes {
                item.table.remove_column(a);
                item.roles.remove(a);
                item.provenance.remove(a);
            }
        }
    }

    /// Record child→parent links for every parent key column, skipping
    /// composite parent keys (single-column FK targets only).
    fn link_to_parent(&mut self, child: &str, pk: &[String], parent: &str) -> Vec<ForeignKey> {
        if pk.len() == 1 {
            vec![ForeignKey {
                table: child.to_string(),
                column: pk[0].clone(),
                ref_table: parent.to_string(),
                ref_column: pk[0].clone(),
                evidence: vec!["child rows reference parent key".to_string()],
            }]
        } else {
            self.skipped.push(SkippedRelationship {
                table: child.to_string(),
                column: pk.join("+"),
                ref_table: parent.to_string(),
                ref_column: pk.join("+"),
                reason: "composite key target".to_string(),
            });
            Vec::new()
        }
    }

    fn dedup_rejections(&mut self) {
        let mut seen = HashSet::new();
        self.rejections
            .retain(|r| seen.insert((r.kind, r.table.clone(), r.subject.clone())));
    }
}

/// Name an extracted entity table after its concept.
fn entity_table_name(parent: &str, intermediate: &str, attributes: &[String]) -> String {
    let all_location = std::iter::once(intermediate)
        .chain(attributes.iter().map(String::as_str))
        .all(|name| {
            let lower = name.to_ascii_lowercase();
            LOCATION_TOKENS.iter().any(|t| lower.contains(t))
        });
    if all_location {
        return format!("{}_location", parent);
    }

    let lower = intermediate.to_ascii_lowercase();
    let base = ["_id", "_code", "_key", "_ref", "_number"]
        .iter()
        .find_map(|suffix| lower.strip_suffix(suffix))
        .unwrap_or(&lower);
    format!("{}_{}", parent, base)
}

fn unique_name(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut counter = 2;
    loop {
        let name = format!("{}_{}", base, counter);
        if used.insert(name.clone()) {
            return name;
        }
        counter += 1;
    }
}

/// Attribute-preservation check over the current working set.
///
/// Every original column must have exactly one own-attribute home, counting
/// derived columns through their provenance. Inherited key copies and
/// generated surrogates are excluded.
fn check_preservation(
    origin: &str,
    original_columns: &[String],
    results: &[SynthTable],
    queue: &VecDeque<WorkItem>,
    children: &[WorkItem],
    current: Option<&WorkItem>,
) -> Result<()> {
    let mut owners: HashMap<&str, usize> = HashMap::new();

    let mut record = |columns: &[String],
                      roles: &HashMap<String, ColumnRole>,
                      provenance: &HashMap<String, String>| {
        let mut owned_here: HashSet<String> = HashSet::new();
        for col in columns {
            let role = roles.get(col).copied().unwrap_or(ColumnRole::OwnAttribute);
            if role != ColumnRole::OwnAttribute {
                continue;
            }
            let source = provenance.get(col).unwrap_or(col);
            owned_here.insert(source.clone());
        }
        for source in owned_here {
            if let Some(orig) = original_columns.iter().find(|c| **c == source) {
                *owners.entry(orig.as_str()).or_insert(0) += 1;
            }
        }
    };

    for t in results {
        record(&t.table.columns, &t.roles, &t.provenance);
    }
    for item in queue.iter().chain(children.iter()).chain(current.into_iter()) {
        record(&item.table.columns, &item.roles, &item.provenance);
    }

    let violations: Vec<String> = original_columns
        .iter()
        .filter(|c| owners.get(c.as_str()).copied().unwrap_or(0) != 1)
        .cloned()
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(NormalizeError::AttributeLoss {
            table: origin.to_string(),
            columns: violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row);
        }
        t
    }

    fn synthesize(input: &Table) -> (Vec<SynthTable>, Vec<RejectedCandidate>) {
        let config = Config::default();
        let mut synth = Synthesizer::new(&config);
        let tables = synth.synthesize(input, &HashSet::new()).unwrap();
        (tables, synth.rejections)
    }

    fn find<'a>(tables: &'a [SynthTable], name: &str) -> &'a SynthTable {
        tables
            .iter()
            .find(|t| t.table.name == name)
            .unwrap_or_else(|| {
                panic!(
                    "table {} missing, got {:?}",
                    name,
                    tables.iter().map(|t| t.table.name.clone()).collect::<Vec<_>>()
                )
            })
    }

    #[test]
    fn test_multivalued_column_explodes_into_child() {
        let input = table(
            "employees",
            &["employee_id", "skills"],
            vec![
                vec![Value::Int(1), "rust, sql".into()],
                vec![Value::Int(2), "go".into()],
            ],
        );
        let (tables, _) = synthesize(&input);
        assert_eq!(tables.len(), 2);

        let parent = find(&tables, "employees");
        assert!(!parent.table.has_column("skills"));
        assert_eq!(parent.primary_key, vec!["employee_id".to_string()]);

        let child = find(&tables, "employees_skills");
        assert_eq!(
            child.table.columns,
            vec![
                "employee_id".to_string(),
                "position".to_string(),
                "skills_value".to_string()
            ]
        );
        assert_eq!(child.table.row_count(), 3);
        assert_eq!(
            child.primary_key,
            vec!["employee_id".to_string(), "position".to_string()]
        );
        assert_eq!(child.provenance.get("skills_value").unwrap(), "skills");
        assert_eq!(child.foreign_keys.len(), 1);
        assert_eq!(child.foreign_keys[0].ref_table, "employees");
    }

    #[test]
    fn test_status_history_split() {
        let input = table(
            "orders",
            &["order_id", "customer_id", "status", "status_date"],
            vec![
                vec![Value::Int(1), Value::Int(7), "placed".into(), "2024-01-01".into()],
                vec![Value::Int(1), Value::Int(7), "shipped".into(), "2024-01-03".into()],
                vec![Value::Int(2), Value::Int(8), "placed".into(), "2024-01-02".into()],
                vec![Value::Int(2), Value::Int(8), "shipped".into(), "2024-01-04".into()],
            ],
        );
        let (tables, _) = synthesize(&input);

        let parent = find(&tables, "orders");
        assert_eq!(parent.primary_key, vec!["order_id".to_string()]);
        assert_eq!(parent.table.row_count(), 2);
        assert!(parent.table.has_column("customer_id"));
        assert!(!parent.table.has_column("status"));

        let child = find(&tables, "orders_status_history");
        assert_eq!(
            child.primary_key,
            vec!["order_id".to_string(), "status_date".to_string()]
        );
        assert!(child.table.has_column("status"));
        assert_eq!(child.table.row_count(), 4);
        assert_eq!(child.foreign_keys[0].ref_table, "orders");
        assert_eq!(child.role("order_id"), ColumnRole::InheritedKey);
    }

    #[test]
    fn test_entity_extraction_location() {
        // 40 customers over 12 cities; city determines state and country.
        let mut input = Table::new(
            "customers",
            vec![
                "customer_id".into(),
                "city".into(),
                "state".into(),
                "country".into(),
            ],
        );
        for i in 0..40i64 {
            let c = i % 12;
            input.push_row(vec![
                Value::Int(i + 1),
                Value::Text(format!("City{}", c)),
                Value::Text(format!("State{}", c % 6)),
                Value::Text(format!("Country{}", c % 3)),
            ]);
        }
        let (tables, _) = synthesize(&input);

        let parent = find(&tables, "customers");
        assert!(parent.table.has_column("city"));
        assert!(!parent.table.has_column("state"));
        assert!(!parent.table.has_column("country"));

        let location = find(&tables, "customers_location");
        assert_eq!(location.table.row_count(), 12);
        assert!(location.table.has_column("state"));
        // city lacks identity semantics, so the entity got a surrogate and
        // the intermediate stays as a unique join column.
        assert_eq!(location.key_kind, KeyKind::Surrogate);
        assert_eq!(
            parent.foreign_keys[0].endpoints(),
            (
                "customers".to_string(),
                "city".to_string(),
                "customers_location".to_string(),
                "city".to_string()
            )
        );
    }

    #[test]
    fn test_low_cardinality_entity_stays_inline() {
        // Only 3 cities over 40 rows: below the unique-value floor.
        let mut input = Table::new(
            "customers",
            vec!["customer_id".into(), "city".into(), "state".into(), "country".into()],
        );
        for i in 0..40i64 {
            let c = i % 3;
            input.push_row(vec![
                Value::Int(i + 1),
                Value::Text(format!("City{}", c)),
                Value::Text(format!("State{}", c)),
                Value::Text(format!("Country{}", c)),
            ]);
        }
        let (tables, rejections) = synthesize(&input);
        assert_eq!(tables.len(), 1);
        assert!(tables[0].table.has_column("state"));
        assert!(rejections
            .iter()
            .any(|r| r.kind == CandidateKind::Entity && r.subject == "city"));
    }

    #[test]
    fn test_partial_dependency_extraction() {
        let input = table(
            "enrollments",
            &["student_id", "course_id", "student_name"],
            vec![
                vec![Value::Int(1), Value::Int(10), "Ada".into()],
                vec![Value::Int(1), Value::Int(11), "Ada".into()],
                vec![Value::Int(2), Value::Int(10), "Alan".into()],
                vec![Value::Int(2), Value::Int(11), "Alan".into()],
            ],
        );
        let (tables, _) = synthesize(&input);

        let parent = find(&tables, "enrollments");
        assert_eq!(
            parent.primary_key,
            vec!["student_id".to_string(), "course_id".to_string()]
        );
        assert!(!parent.table.has_column("student_name"));

        let child = find(&tables, "enrollments_student_id");
        assert_eq!(child.primary_key, vec!["student_id".to_string()]);
        assert_eq!(child.table.row_count(), 2);
        assert_eq!(parent.foreign_keys[0].ref_table, "enrollments_student_id");
    }

    #[test]
    fn test_identity_gate_yields_surrogate() {
        let input = table(
            "people",
            &["city", "salary", "email"],
            vec![
                vec!["Oslo".into(), Value::Int(1), "a@x".into()],
                vec!["Bergen".into(), Value::Int(2), "b@x".into()],
            ],
        );
        let (tables, _) = synthesize(&input);
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.key_kind, KeyKind::Surrogate);
        assert_eq!(t.primary_key, vec!["people_id".to_string()]);
        assert_eq!(t.role("people_id"), ColumnRole::Surrogate);
        // All three original columns survive.
        for col in ["city", "salary", "email"] {
            assert!(t.table.has_column(col));
        }
    }

    #[test]
    fn test_structurally_empty_table_rejected() {
        let input = Table::new("empty", vec![]);
        let config = Config::default();
        let mut synth = Synthesizer::new(&config);
        assert!(synth.synthesize(&input, &HashSet::new()).is_err());
    }

    #[test]
    fn test_entity_table_name_location() {
        assert_eq!(
            entity_table_name("customers", "city", &["state".into(), "country".into()]),
            "customers_location"
        );
        assert_eq!(
            entity_table_name("products", "supplier_code", &["supplier_email".into()]),
            "products_supplier"
        );
    }
}
