//! Dialect-aware DDL rendering for the normalized schema.

mod dialect;
mod script;

pub use dialect::{dialect_for, OracleDialect, PostgresDialect, SqlDialect};
pub use script::render_ddl;
