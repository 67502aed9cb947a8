//! Configuration type definitions with heuristic thresholds.
//!
//! All thresholds are explicit, overridable values rather than module-level
//! constants, so tests can exercise boundary behavior deterministically and
//! a single process can evaluate multiple configurations.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Column and dependency profiling thresholds.
    #[serde(default)]
    pub profiling: ProfilingConfig,

    /// Entity promotion thresholds.
    #[serde(default)]
    pub entity: EntityConfig,

    /// Foreign-key detection thresholds.
    #[serde(default)]
    pub foreign_keys: ForeignKeyConfig,
}

/// Column and dependency profiling thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilingConfig {
    /// Fraction of non-null values that must parse under a candidate type
    /// for it to be accepted (default: 0.95).
    #[serde(default = "default_type_coverage")]
    pub type_coverage: f64,

    /// Fraction of non-null values that must contain a delimiter (and split
    /// into at least two tokens) for a column to be flagged multivalued
    /// (default: 0.5).
    #[serde(default = "default_multivalued_fraction")]
    pub multivalued_fraction: f64,

    /// Maximum size of composite candidate keys (default: 3).
    #[serde(default = "default_max_key_size")]
    pub max_key_size: usize,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            type_coverage: default_type_coverage(),
            multivalued_fraction: default_multivalued_fraction(),
            max_key_size: default_max_key_size(),
        }
    }
}

/// Entity promotion thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Minimum confidence for promoting an entity candidate to its own
    /// table (default: 0.40).
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Minimum distinct-value count for an intermediate column. When unset,
    /// derived as max(10, 1% of the table's row count).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_unique_values: Option<usize>,

    /// Minimum uniqueness ratio for an intermediate column (default: 0.02).
    #[serde(default = "default_min_uniqueness_ratio")]
    pub min_uniqueness_ratio: f64,
}

impl EntityConfig {
    /// Effective unique-value floor for a table of `row_count` rows.
    #[must_use]
    pub fn unique_floor(&self, row_count: usize) -> usize {
        match self.min_unique_values {
            Some(v) => v,
            None => 10.max(row_count / 100),
        }
    }
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            min_unique_values: None,
            min_uniqueness_ratio: default_min_uniqueness_ratio(),
        }
    }
}

/// Foreign-key detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// Minimum composite score for accepting a relationship (default: 0.70).
    /// Tuned so a strong name match plus high value overlap dominates and
    /// weak evidence fails.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,
}

impl Default for ForeignKeyConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance_threshold(),
        }
    }
}

// Default value functions for serde

fn default_type_coverage() -> f64 {
    0.95
}

fn default_multivalued_fraction() -> f64 {
    0.5
}

fn default_max_key_size() -> usize {
    3
}

fn default_confidence_threshold() -> f64 {
    0.40
}

fn default_min_uniqueness_ratio() -> f64 {
    0.02
}

fn default_acceptance_threshold() -> f64 {
    0.70
}
