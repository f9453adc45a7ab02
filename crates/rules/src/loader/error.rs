//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

use crate::validation::ValidationResult;

/// Errors that can occur during rule loading and management.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// JSON parse/deserialization error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rule failed validation.
    #[error("Validation error: {0}")]
    Validation(ValidationResult),

    /// The rule set as a whole cannot be used (per-file failures, duplicate
    /// names, no rules at all).
    #[error("invalid rule set:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Rule was successfully loaded.
    Loaded { rule_name: String },
    /// File was skipped (dotfile, unsupported extension).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}
