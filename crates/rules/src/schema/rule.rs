//! Rule file and compiled rule types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stupid_core::RAW_HITS_TITLE;

use super::{Condition, OutputConfig};
use crate::validation::{self, ValidationResult};

/// A rule exactly as it appears in a rule file.
///
/// `conditions` stay untyped here so that every problem in a condition can be
/// reported at once by [`validation`] instead of failing on the first one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleFile {
    pub name: String,
    pub index: String,
    pub schedule: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_field: Option<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<Value>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

impl RuleFile {
    /// Validate and turn this file into a runnable [`Rule`].
    pub fn compile(self) -> Result<Rule, ValidationResult> {
        validation::compile(self)
    }
}

/// A validated rule. Immutable once a job has been started for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub index: String,
    /// Opaque query body sent verbatim to `_search`.
    pub body: Value,
    /// Six-field cron expression (five-field input is normalized).
    pub schedule: String,
    /// Path of the raw documents dumped into the alert text.
    pub body_field: String,
    pub filters: Vec<String>,
    pub conditions: Vec<Condition>,
    pub outputs: Vec<OutputConfig>,
}

impl Rule {
    pub fn body_field_or_default(field: Option<String>) -> String {
        field
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| RAW_HITS_TITLE.to_string())
    }
}
