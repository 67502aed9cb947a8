//! # autonorm
//!
//! Automated Third-Normal-Form schema synthesis for unlabeled tabular data.
//!
//! This library ingests independent tables with no declared schema or keys
//! and rewrites them into a normalized relational schema:
//!
//! - **Column profiling** with type, multivalued and structured-field inference
//! - **Dependency discovery**: candidate keys, functional, partial and
//!   transitive dependencies, verified against the sampled data
//! - **Key selection** gated on identity semantics, with surrogate fallback
//! - **Entity and pattern classification** deciding which dependencies earn
//!   their own table
//! - **1NF → 2NF → 3NF synthesis** with a hard attribute-preservation invariant
//! - **Foreign-key detection** across the synthesized set, validated against
//!   PK/unique targets
//! - **DDL and ER-diagram rendering** for the final schema
//!
//! ## Example
//!
//! ```rust,no_run
//! use autonorm::{load_dir, Config, Pipeline};
//!
//! fn main() -> autonorm::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let inputs = load_dir("./input_files")?;
//!     let result = Pipeline::new(config).run(inputs.tables);
//!     println!(
//!         "{} tables in, {} tables out, {} foreign keys",
//!         result.tables_in,
//!         result.tables_out,
//!         result.relationships.len()
//!     );
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod core;
pub mod ddl;
pub mod erd;
pub mod error;
pub mod fk;
pub mod keys;
pub mod orchestrator;
pub mod profile;
pub mod source;
pub mod synth;
pub mod verify;

// Re-exports for convenient access
pub use config::Config;
pub use core::{ColumnType, ForeignKey, NormalizedTable, Table, Value};
pub use error::{NormalizeError, Result};
pub use orchestrator::{Pipeline, RunResult, TableStatus};
pub use source::{load_dir, load_file, LoadOutcome};
pub use synth::{SynthTable, Synthesizer};
