//! Functional-dependency discovery and candidate-key enumeration.
//!
//! All tests here are purely extensional: they state what holds over the
//! sampled rows, not what must hold algebraically. Partition the rows by the
//! determinant's canonical values; a dependency holds when every partition
//! carries exactly one distinct non-null dependent value.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::ProfilingConfig;
use crate::core::{CandidateKey, PartialDependency, Table, TransitiveChain};
use crate::keys::{key_eligibility, IdentityConfidence};

use super::column::ColumnProfile;

/// Dependency-level profile of one table.
#[derive(Debug, Clone)]
pub struct TableProfile {
    /// Table name.
    pub table: String,

    /// Enumerated candidate keys (singles first, then composites).
    pub candidate_keys: Vec<CandidateKey>,

    /// Partial dependencies w.r.t. the given composite key (2NF).
    pub partial_dependencies: Vec<PartialDependency>,

    /// Verified transitive chains w.r.t. the given key (3NF).
    pub transitive_dependencies: Vec<TransitiveChain>,
}

/// Partition row indices by the canonical key of the given columns.
fn partition_rows(table: &Table, col_indices: &[usize]) -> HashMap<String, Vec<usize>> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..table.row_count() {
        groups
            .entry(table.row_key(row, col_indices))
            .or_default()
            .push(row);
    }
    groups
}

/// Test the functional dependency `determinant → dependent`.
///
/// Every partition by the determinant must hold exactly one distinct
/// non-null dependent value.
pub fn is_functional_dependency(table: &Table, determinant: &[String], dependent: &str) -> bool {
    if table.row_count() < 2 {
        return false;
    }
    let det_indices: Vec<usize> = match determinant
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Option<Vec<_>>>()
    {
        Some(idx) => idx,
        None => return false,
    };
    let dep_index = match table.column_index(dependent) {
        Some(idx) => idx,
        None => return false,
    };

    for rows in partition_rows(table, &det_indices).values() {
        let mut distinct: HashSet<String> = HashSet::new();
        for &row in rows {
            let value = &table.rows[row][dep_index];
            if !value.is_null() {
                distinct.insert(value.key());
            }
        }
        if distinct.len() != 1 {
            return false;
        }
    }
    true
}

/// Count distinct tuples over the given columns.
pub fn distinct_tuples(table: &Table, columns: &[String]) -> usize {
    let indices: Vec<usize> = columns
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();
    partition_rows(table, &indices).len()
}

/// Whether the joint tuple over the given columns is unique and non-null.
pub fn joint_unique_non_null(table: &Table, columns: &[String]) -> bool {
    let indices: Vec<usize> = match columns
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Option<Vec<_>>>()
    {
        Some(idx) => idx,
        None => return false,
    };
    for row in 0..table.row_count() {
        if indices.iter().any(|&i| table.rows[row][i].is_null()) {
            return false;
        }
    }
    partition_rows(table, &indices).len() == table.row_count()
}

/// Enumerate candidate keys for a table.
///
/// A single column qualifies only with identity semantics, uniqueness ratio
/// 1.0 and zero nulls. Composites (bounded by `max_key_size`, at least one
/// identity-bearing member) are tried only when no single-column key exists.
pub fn find_candidate_keys(
    table: &Table,
    profiles: &[ColumnProfile],
    config: &ProfilingConfig,
) -> Vec<CandidateKey> {
    if table.row_count() == 0 {
        return Vec::new();
    }

    let mut keys: Vec<CandidateKey> = Vec::new();
    for profile in profiles {
        if !profile.key_eligible() || !profile.is_unique_non_null() {
            continue;
        }
        if key_eligibility(&profile.name).eligible {
            keys.push(CandidateKey::new(vec![profile.name.clone()]));
        }
    }
    if !keys.is_empty() {
        return keys;
    }

    let eligible: Vec<&ColumnProfile> = profiles.iter().filter(|p| p.key_eligible()).collect();
    let max_size = config.max_key_size.min(eligible.len());
    for size in 2..=max_size {
        for combo in combinations(eligible.len(), size) {
            let columns: Vec<String> = combo.iter().map(|&i| eligible[i].name.clone()).collect();
            let has_identity = columns.iter().any(|c| {
                key_eligibility(c).confidence >= IdentityConfidence::Moderate
                    && key_eligibility(c).eligible
            });
            if !has_identity {
                continue;
            }
            if joint_unique_non_null(table, &columns) {
                debug!(
                    table = table.name.as_str(),
                    key = columns.join("+"),
                    "composite candidate key"
                );
                keys.push(CandidateKey::new(columns));
                if keys.len() >= 3 {
                    break;
                }
            }
        }
        if !keys.is_empty() {
            break;
        }
    }
    keys
}

/// Detect partial dependencies for a table with a composite primary key.
///
/// A proper non-empty subset of the key must determine a non-key attribute,
/// actually vary in the data, and not degenerate to the full key.
pub fn detect_partial_dependencies(
    table: &Table,
    primary_key: &[String],
) -> Vec<PartialDependency> {
    if primary_key.len() < 2 {
        return Vec::new();
    }
    let non_key: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !primary_key.contains(c))
        .cloned()
        .collect();
    if non_key.is_empty() {
        return Vec::new();
    }

    let full_distinct = distinct_tuples(table, primary_key);
    let mut found: Vec<PartialDependency> = Vec::new();

    for size in 1..primary_key.len() {
        for combo in combinations(primary_key.len(), size) {
            let subset: Vec<String> = combo.iter().map(|&i| primary_key[i].clone()).collect();
            let subset_distinct = distinct_tuples(table, &subset);
            // Degenerate subsets carry the full key's information and prove
            // nothing about partial dependence.
            if subset_distinct < 2 || subset_distinct >= full_distinct {
                continue;
            }
            let dependents: Vec<String> = non_key
                .iter()
                .filter(|col| is_functional_dependency(table, &subset, col))
                .cloned()
                .collect();
            if !dependents.is_empty() {
                found.push(PartialDependency {
                    determinant: subset,
                    dependents,
                });
            }
        }
    }
    found
}

/// Detect verified transitive chains PK → A → B for a table.
///
/// A chain is accepted only if PK→A holds, A→B holds, A varies (≥2 distinct
/// values), and some A value recurs under at least two distinct PK values
/// (ruling out accidental 1:1 pairings that are really a renamed key).
pub fn detect_transitive_dependencies(
    table: &Table,
    profiles: &[ColumnProfile],
    primary_key: &[String],
) -> Vec<TransitiveChain> {
    if primary_key.is_empty() || table.row_count() < 2 {
        return Vec::new();
    }

    let non_key: Vec<&ColumnProfile> = profiles
        .iter()
        .filter(|p| !primary_key.contains(&p.name))
        .collect();

    let pk_determined: Vec<String> = non_key
        .iter()
        .filter(|p| is_functional_dependency(table, primary_key, &p.name))
        .map(|p| p.name.clone())
        .collect();

    let mut chains: Vec<TransitiveChain> = Vec::new();
    for intermediate in &pk_determined {
        let profile = match profiles.iter().find(|p| &p.name == intermediate) {
            Some(p) => p,
            None => continue,
        };
        if !profile.key_eligible() || profile.distinct_count < 2 {
            continue;
        }
        if !intermediate_reused(table, primary_key, intermediate) {
            continue;
        }

        let dependents: Vec<String> = pk_determined
            .iter()
            .filter(|b| {
                *b != intermediate && is_functional_dependency(table, &[intermediate.clone()], b)
            })
            .cloned()
            .collect();
        if !dependents.is_empty() {
            chains.push(TransitiveChain {
                key: primary_key.to_vec(),
                intermediate: intermediate.clone(),
                dependents,
            });
        }
    }

    // An attribute that already follows one intermediate should not also be
    // extracted through another chain; keep the widest chain per attribute.
    chains.sort_by_key(|c| std::cmp::Reverse(c.dependents.len()));
    let mut claimed: HashSet<String> = HashSet::new();
    let mut kept: Vec<TransitiveChain> = Vec::new();
    for mut chain in chains {
        if claimed.contains(&chain.intermediate) {
            continue;
        }
        chain.dependents.retain(|d| !claimed.contains(d));
        if chain.dependents.is_empty() {
            continue;
        }
        claimed.insert(chain.intermediate.clone());
        for d in &chain.dependents {
            claimed.insert(d.clone());
        }
        kept.push(chain);
    }
    kept
}

/// Whether some intermediate value recurs under at least two distinct PK values.
fn intermediate_reused(table: &Table, primary_key: &[String], intermediate: &str) -> bool {
    let pk_indices: Vec<usize> = match primary_key
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Option<Vec<_>>>()
    {
        Some(idx) => idx,
        None => return false,
    };
    let inter_index = match table.column_index(intermediate) {
        Some(idx) => idx,
        None => return false,
    };

    let mut pks_per_value: HashMap<String, HashSet<String>> = HashMap::new();
    for row in 0..table.row_count() {
        let value = &table.rows[row][inter_index];
        if value.is_null() {
            continue;
        }
        pks_per_value
            .entry(value.key())
            .or_default()
            .insert(table.row_key(row, &pk_indices));
    }
    pks_per_value.values().any(|pks| pks.len() >= 2)
}

/// Profile the dependency structure of one table, given its column profiles
/// and (already selected) primary key.
pub fn profile_dependencies(
    table: &Table,
    profiles: &[ColumnProfile],
    primary_key: &[String],
    config: &ProfilingConfig,
) -> TableProfile {
    let candidate_keys = find_candidate_keys(table, profiles, config);
    let partial_dependencies = if primary_key.len() > 1 {
        detect_partial_dependencies(table, primary_key)
    } else {
        Vec::new()
    };
    let transitive_dependencies = detect_transitive_dependencies(table, profiles, primary_key);
    TableProfile {
        table: table.name.clone(),
        candidate_keys,
        partial_dependencies,
        transitive_dependencies,
    }
}

/// Index combinations of `n` items taken `k` at a time.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut current = Vec::with_capacity(k);
    fn recurse(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            recurse(i + 1, n, k, current, out);
            current.pop();
        }
    }
    recurse(0, n, k, &mut current, &mut result);
    result
}
