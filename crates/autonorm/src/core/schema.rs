//! Schema metadata types for the normalization pipeline.
//!
//! These types provide a database-agnostic representation of the structural
//! facts inferred from data: candidate keys, functional dependencies, entity
//! candidates, multi-row patterns, and the normalized output tables.

use serde::{Deserialize, Serialize};

use super::table::Table;
use super::value::ColumnType;

/// An ordered, non-empty set of column names whose joint values are unique
/// and non-null over the sampled table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateKey {
    /// Member columns, in table order.
    pub columns: Vec<String>,
}

impl CandidateKey {
    /// Create a candidate key from a column list.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Whether this is a single-column key.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.columns.len() == 1
    }
}

/// A functional dependency: the dependent takes exactly one value for every
/// distinct value of the determinant observed in the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalDependency {
    /// Determinant column set.
    pub determinant: Vec<String>,

    /// Dependent column.
    pub dependent: String,
}

/// A partial dependency: a proper subset of a composite key determines one
/// or more non-key attributes (2NF violation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDependency {
    /// The determining proper subset of the primary key.
    pub determinant: Vec<String>,

    /// Non-key attributes determined by the subset.
    pub dependents: Vec<String>,
}

/// A verified transitive chain PK → intermediate → dependents (3NF violation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitiveChain {
    /// The table's primary key.
    pub key: Vec<String>,

    /// The intermediate column.
    pub intermediate: String,

    /// Columns transitively dependent via the intermediate.
    pub dependents: Vec<String>,
}

/// Classification of a promoted entity candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// High value diversity, likely master data.
    MasterEntity,

    /// Carries contact/address attributes.
    ReferenceEntity,

    /// Lower diversity, structured reference data.
    LookupEntity,
}

/// An intermediate column suspected of being a promotable sub-entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCandidate {
    /// The intermediate column.
    pub column: String,

    /// Confidence score in [0, 1].
    pub confidence: f64,

    /// Entity classification.
    pub class: EntityClass,

    /// Attributes with a stable dependency on the intermediate.
    pub attributes: Vec<String>,

    /// Human-readable justifications.
    pub evidence: Vec<String>,
}

/// Classification of a table exhibiting duplicate key values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiRowPattern {
    /// Key does not repeat.
    None,

    /// Temporal columns among the repeating group.
    EventHistory,

    /// A status-like column varies across repeats of the same key.
    StatusHistory,

    /// Table name suggests line/item granularity.
    LineItems,

    /// An explicit sequence/order/rank column is present.
    SequencedChildren,

    /// Generic one-to-many child rows.
    ChildRecords,
}

impl MultiRowPattern {
    /// Suffix used when naming the split-off child table.
    #[must_use]
    pub fn table_suffix(&self) -> &'static str {
        match self {
            MultiRowPattern::None => "",
            MultiRowPattern::EventHistory => "event_history",
            MultiRowPattern::StatusHistory => "status_history",
            MultiRowPattern::LineItems => "line_items",
            MultiRowPattern::SequencedChildren => "children",
            MultiRowPattern::ChildRecords => "records",
        }
    }
}

/// A foreign-key relationship between two synthesized tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Source (referencing) table name.
    pub table: String,

    /// Source column name.
    pub column: String,

    /// Target (referenced) table name.
    pub ref_table: String,

    /// Target column name.
    pub ref_column: String,

    /// Why this relationship was accepted.
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl ForeignKey {
    /// Identity tuple for de-duplication.
    #[must_use]
    pub fn endpoints(&self) -> (String, String, String, String) {
        (
            self.table.clone(),
            self.column.clone(),
            self.ref_table.clone(),
            self.ref_column.clone(),
        )
    }
}

/// A relationship candidate rejected by detection or validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRelationship {
    /// Source table name.
    pub table: String,

    /// Source column name.
    pub column: String,

    /// Intended target table name.
    pub ref_table: String,

    /// Intended target column name.
    pub ref_column: String,

    /// Specific reason the relationship was not materialized.
    pub reason: String,
}

/// Kind of a rejected candidate, for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Entity,
    Pattern,
    Key,
    ForeignKey,
}

/// Audit record for any rejected candidate (entity, pattern, key, FK).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedCandidate {
    /// What kind of candidate was rejected.
    pub kind: CandidateKind,

    /// Table the candidate belongs to.
    pub table: String,

    /// The column or key the candidate concerned.
    pub subject: String,

    /// Evidence: computed statistics and thresholds compared against.
    pub evidence: Vec<String>,
}

/// Role of a column within a normalized output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// An attribute owned by this table (original or derived from one).
    OwnAttribute,

    /// A parent-key column copied in to link back to its owner.
    InheritedKey,

    /// A generated surrogate identifier or position column.
    Surrogate,
}

/// A column of a normalized output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputColumn {
    /// Column name.
    pub name: String,

    /// Role within this table.
    pub role: ColumnRole,

    /// Inferred scalar type.
    pub data_type: ColumnType,

    /// Original input column this one derives from, when renamed or
    /// decomposed (e.g. exploded `tags` → `tags_value`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Output unit of the synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTable {
    /// Table name.
    pub name: String,

    /// Input table this one traces to.
    pub origin: String,

    /// Ordered column list with roles.
    pub columns: Vec<OutputColumn>,

    /// Row data (not part of the serialized report).
    #[serde(skip)]
    pub rows: Vec<Vec<super::value::Value>>,

    /// Primary key column names.
    pub primary_key: Vec<String>,

    /// Outbound foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
}

impl NormalizedTable {
    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if the table has a single-column primary key.
    #[must_use]
    pub fn has_single_pk(&self) -> bool {
        self.primary_key.len() == 1
    }

    /// View the row data as a [`Table`] for profiling primitives.
    #[must_use]
    pub fn as_table(&self) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.column_names(),
            rows: self.rows.clone(),
        }
    }
}
