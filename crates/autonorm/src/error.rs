//! Error types for the normalization library.

use thiserror::Error;

/// Main error type for normalization operations.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Configuration error (invalid YAML, out-of-range threshold, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input table could not be read or is structurally empty
    #[error("Input error for table {table}: {message}")]
    Input { table: String, message: String },

    /// Attribute-preservation invariant violated during synthesis.
    ///
    /// This indicates a synthesis bug rather than a data-quality issue and
    /// aborts the run for the affected table.
    #[error("Attribute loss in table {table}: columns {columns:?} unaccounted for after synthesis")]
    AttributeLoss { table: String, columns: Vec<String> },

    /// Generated schema failed post-synthesis verification
    #[error("Schema verification failed: {0}")]
    Verification(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl NormalizeError {
    /// Create an Input error for a specific table.
    pub fn input(table: impl Into<String>, message: impl Into<String>) -> Self {
        NormalizeError::Input {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            NormalizeError::Config(_) | NormalizeError::Yaml(_) => 1,
            NormalizeError::Input { .. } | NormalizeError::Csv(_) => 2,
            NormalizeError::AttributeLoss { .. } => 3,
            NormalizeError::Verification(_) => 4,
            NormalizeError::Io(_) => 7,
            NormalizeError::Json(_) => 1,
        }
    }
}

/// Result type alias for normalization operations.
pub type Result<T> = std::result::Result<T, NormalizeError>;
