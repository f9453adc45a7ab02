//! Identity, query and schedule checks.

use crate::scheduler::parse_schedule;
use crate::schema::RuleFile;

use super::ValidationResult;

pub(super) fn validate_identity(file: &RuleFile, result: &mut ValidationResult) {
    if file.name.trim().is_empty() {
        result.error("name", "Rule name must not be empty");
    }
    if file.index.trim().is_empty() {
        result.error("index", "Rule index must not be empty");
    }
}

pub(super) fn validate_query(file: &RuleFile, result: &mut ValidationResult) {
    match &file.body {
        serde_json::Value::Object(map) if map.is_empty() => {
            result.warn("body", "Query body is empty; every document in the index matches");
        }
        serde_json::Value::Object(_) => {}
        serde_json::Value::Null => result.error("body", "Rule must define a query 'body'"),
        other => result.error(
            "body",
            format!("Query body must be an object, got {}", json_type(other)),
        ),
    }

    for (i, filter) in file.filters.iter().enumerate() {
        if filter.trim().is_empty() {
            result.error(format!("filters[{i}]"), "Filter path must not be empty");
        }
    }

    if let Some(field) = &file.body_field {
        if field.trim().is_empty() {
            result.warn("body_field", "Empty body_field, defaulting to 'hits.hits._source'");
        }
    }
}

pub(super) fn validate_schedule(file: &RuleFile, result: &mut ValidationResult) {
    if file.schedule.trim().is_empty() {
        result.error("schedule", "Rule schedule must not be empty");
        return;
    }
    if let Err(e) = parse_schedule(&file.schedule) {
        result.error(
            "schedule",
            format!("Invalid cron expression '{}': {e}", file.schedule),
        );
    }
}

pub(super) fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
