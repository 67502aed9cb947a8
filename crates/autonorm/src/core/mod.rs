//! Core data model: scalar values, in-memory tables, schema metadata.

pub mod schema;
pub mod table;
pub mod value;

pub use schema::{
    CandidateKey, CandidateKind, ColumnRole, EntityCandidate, EntityClass, ForeignKey,
    FunctionalDependency, MultiRowPattern, NormalizedTable, OutputColumn, PartialDependency,
    RejectedCandidate, SkippedRelationship, TransitiveChain,
};
pub use table::Table;
pub use value::{ColumnType, Value};
