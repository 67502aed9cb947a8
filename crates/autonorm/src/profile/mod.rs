//! Statistical profiling: per-column statistics and dependency discovery.

mod column;
mod deps;

pub use column::{
    profile_column, profile_columns, ColumnProfile, MultivaluedInfo, StructuredField,
};
pub use deps::{
    detect_partial_dependencies, detect_transitive_dependencies, distinct_tuples,
    find_candidate_keys, is_functional_dependency, joint_unique_non_null, profile_dependencies,
    TableProfile,
};
