//! Alert rule engine for scheduled search queries.
//!
//! This crate provides:
//! - JSON / YAML rule definitions with serde deserialization
//! - Load-time validation with aggregated, path-addressed errors
//! - Filesystem loader with hot-reload via `notify` watcher
//! - Dotted-path traversal over search responses with bucket fan-out
//! - Record extraction and the condition DSL evaluator
//! - Cron normalization helpers for per-rule schedules

pub mod evaluator;
pub mod extract;
pub mod jsonpath;
pub mod loader;
pub mod scheduler;
pub mod schema;
pub mod validation;

pub use evaluator::evaluate;
pub use extract::{extract, extract_with_body_field, ExtractError};
pub use loader::{RuleError, RuleLoader};
pub use schema::{Condition, OutputConfig, Quantifier, Rule, RuleFile};
pub use validation::ValidationResult;
