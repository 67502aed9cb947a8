//! Semantic entity confidence scoring.
//!
//! Decides whether a verified transitive-dependency intermediate represents
//! a genuine sub-entity worth extracting into its own table, or merely a
//! categorical value whose attributes should stay inline. Returns the score
//! together with the itemized evidence so rejections are auditable.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::EntityConfig;
use crate::core::{EntityClass, Table};
use crate::profile::is_functional_dependency;

/// Attributes that strongly suggest a real-world entity (contact/address).
const STRUCTURAL_INDICATORS: [&str; 13] = [
    "email", "phone", "address", "street", "city", "state", "zip", "postal", "country",
    "website", "url", "contact", "fax",
];

/// Generic words ignored when looking for shared semantic tokens.
const COMMON_TOKENS: [&str; 14] = [
    "id", "code", "name", "desc", "description", "number", "num", "value", "text", "data",
    "info", "type", "status", "key",
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").unwrap());

/// Scored entity candidate with evidence.
#[derive(Debug, Clone)]
pub struct EntityScore {
    /// Confidence in [0, 1].
    pub confidence: f64,

    /// Classification, meaningful when promoted.
    pub class: EntityClass,

    /// Dependents with a stable functional dependency on the intermediate.
    pub stable_attributes: Vec<String>,

    /// Human-readable justifications, both for and against.
    pub evidence: Vec<String>,

    /// Whether the candidate clears every promotion gate.
    pub promoted: bool,
}

impl EntityScore {
    fn rejected(evidence: Vec<String>) -> Self {
        Self {
            confidence: 0.0,
            class: EntityClass::LookupEntity,
            stable_attributes: Vec::new(),
            evidence,
            promoted: false,
        }
    }
}

/// Score whether `intermediate` (with `dependents` hanging off it) is a
/// genuine sub-entity of `table`.
pub fn score_entity(
    table: &Table,
    intermediate: &str,
    dependents: &[String],
    config: &EntityConfig,
) -> EntityScore {
    if dependents.is_empty() {
        return EntityScore::rejected(vec!["no dependent attributes".to_string()]);
    }

    let values = table.column_values(intermediate);
    let non_null: Vec<String> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.key())
        .collect();
    let unique_count = non_null.iter().collect::<HashSet<_>>().len();
    let uniqueness_ratio = if non_null.is_empty() {
        0.0
    } else {
        unique_count as f64 / non_null.len() as f64
    };

    let floor = config.unique_floor(table.row_count());
    if unique_count < floor || uniqueness_ratio < config.min_uniqueness_ratio {
        return EntityScore::rejected(vec![format!(
            "low cardinality: {} unique ({:.1}%), floor {} / {:.1}%",
            unique_count,
            uniqueness_ratio * 100.0,
            floor,
            config.min_uniqueness_ratio * 100.0
        )]);
    }

    let stable_attributes: Vec<String> = dependents
        .iter()
        .filter(|dep| {
            table.has_column(dep)
                && is_functional_dependency(table, &[intermediate.to_string()], dep)
        })
        .cloned()
        .collect();
    if stable_attributes.is_empty() {
        return EntityScore::rejected(vec!["no stable functional dependencies".to_string()]);
    }

    let mut confidence = 0.0;
    let mut evidence = Vec::new();

    confidence += match stable_attributes.len() {
        1 => 0.1,
        2 => 0.3,
        _ => 0.5,
    };
    evidence.push(format!("{} stable attributes", stable_attributes.len()));

    if (0.05..=0.7).contains(&uniqueness_ratio) {
        confidence += 0.2;
        evidence.push(format!(
            "uniqueness {:.1}% in master-data band",
            uniqueness_ratio * 100.0
        ));
    } else if (0.02..=0.9).contains(&uniqueness_ratio) {
        confidence += 0.1;
        evidence.push(format!(
            "uniqueness {:.1}% near master-data band",
            uniqueness_ratio * 100.0
        ));
    }

    let has_structural = stable_attributes.iter().any(|col| {
        let lower = col.to_ascii_lowercase();
        STRUCTURAL_INDICATORS.iter().any(|ind| lower.contains(ind))
    });
    if has_structural {
        confidence += 0.3;
        evidence.push("has contact/address attributes".to_string());
    }

    if let Some(token) = shared_semantic_token(intermediate, &stable_attributes) {
        confidence += 0.2;
        evidence.push(format!("columns share semantic token '{}'", token));
    }

    evidence.push(format!(
        "cardinality: {} unique ({:.1}%)",
        unique_count,
        uniqueness_ratio * 100.0
    ));

    let promoted =
        confidence >= config.confidence_threshold && stable_attributes.len() >= 2;
    if !promoted {
        if stable_attributes.len() < 2 {
            evidence.push("fewer than 2 stable attributes".to_string());
        } else {
            evidence.push(format!(
                "confidence {:.2} below threshold {:.2}",
                confidence, config.confidence_threshold
            ));
        }
    }

    let class = if uniqueness_ratio > 0.5 {
        EntityClass::MasterEntity
    } else if has_structural {
        EntityClass::ReferenceEntity
    } else {
        EntityClass::LookupEntity
    };

    EntityScore {
        confidence,
        class,
        stable_attributes,
        evidence,
        promoted,
    }
}

/// A non-generic lexical token shared by at least two of the column names.
fn shared_semantic_token(intermediate: &str, attributes: &[String]) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names: Vec<&str> = vec![intermediate];
    names.extend(attributes.iter().map(String::as_str));

    for name in names {
        let lower = name.to_ascii_lowercase();
        let tokens: HashSet<String> = WORD_RE
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .filter(|t| !COMMON_TOKENS.contains(&t.as_str()))
            .collect();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, n)| *n >= 2)
        .max_by_key(|(t, n)| (*n, t.len()))
        .map(|(t, _)| t)
}
