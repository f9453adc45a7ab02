//! Condition evaluator.
//!
//! A rule's conditions are ANDed. Each condition collects every value at its
//! path (with the same bucket fan-out used for extraction) and applies its
//! quantifier:
//! - **any**: at least one value satisfies; no values is false
//! - **all**: every value satisfies; no values is true
//! - **none**: no value satisfies; no values is true

mod operators;

use serde_json::Value;
use tracing::debug;

use crate::jsonpath::get_all;
use crate::schema::{Condition, Quantifier};

pub use operators::satisfied;

/// Evaluate all conditions against a raw search response.
pub fn evaluate(response: &Value, conditions: &[Condition]) -> bool {
    for condition in conditions {
        if !condition_met(response, condition) {
            debug!(field = %condition.field, quantifier = %condition.quantifier, "condition not met");
            return false;
        }
    }
    true
}

/// Evaluate a single condition.
pub fn condition_met(response: &Value, condition: &Condition) -> bool {
    let matches = get_all(response, &condition.field);
    let mut values = matches.iter().map(|m| m.value);
    match condition.quantifier {
        Quantifier::Any => values.any(|v| satisfied(v, condition)),
        Quantifier::All => values.all(|v| satisfied(v, condition)),
        Quantifier::None => !values.any(|v| satisfied(v, condition)),
    }
}
