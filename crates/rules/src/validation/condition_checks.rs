//! Condition DSL checks: every error of every condition is reported.

use serde_json::Value;

use crate::schema::{Condition, RuleFile};

use super::fuzzy::fuzzy_match;
use super::ValidationResult;

const QUANTIFIERS: &[&str] = &["any", "all", "none"];

pub(super) fn validate_conditions(file: &RuleFile, result: &mut ValidationResult) {
    for (i, raw) in file.conditions.iter().enumerate() {
        let path = format!("conditions[{i}]");
        match Condition::parse(raw) {
            Ok(condition) => {
                if !condition.has_operators() {
                    result.warn(&path, "Condition has no operators and is satisfied by any value");
                }
            }
            Err(errors) => {
                let suggestion = raw
                    .get("quantifier")
                    .and_then(Value::as_str)
                    .and_then(|q| fuzzy_match(q, QUANTIFIERS));
                for message in errors {
                    match suggestion {
                        Some(s) if message.contains("'quantifier'") => {
                            result.error_with_suggestion(&path, message, s)
                        }
                        _ => result.error(&path, message),
                    }
                }
            }
        }
    }
}
