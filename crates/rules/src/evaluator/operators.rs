//! Per-value operator checks.

use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use serde_json::{Number, Value};
use tracing::warn;

use crate::schema::{decimal_from_number, Condition, Operand};

/// Whether a single value satisfies every operator of `condition` that applies
/// to its JSON type.
///
/// Objects, arrays and nulls cannot be compared; they are treated as
/// satisfying the condition and a warning is logged.
pub fn satisfied(value: &Value, condition: &Condition) -> bool {
    match value {
        Value::String(s) => string_satisfied(s, condition),
        Value::Number(n) => number_satisfied(n, condition),
        Value::Bool(b) => bool_satisfied(*b, condition),
        other => {
            warn!(
                field = %condition.field,
                value = %other,
                "value is not a string, number, or boolean; ignoring condition for this value"
            );
            true
        }
    }
}

fn string_satisfied(s: &str, condition: &Condition) -> bool {
    let mut sat = true;
    if let Some(Operand::Text(v)) = &condition.eq {
        sat &= s == v;
    }
    if let Some(Operand::Text(v)) = &condition.ne {
        sat &= s != v;
    }
    sat
}

fn bool_satisfied(b: bool, condition: &Condition) -> bool {
    let mut sat = true;
    if let Some(Operand::Bool(v)) = condition.eq {
        sat &= b == v;
    }
    if let Some(Operand::Bool(v)) = condition.ne {
        sat &= b != v;
    }
    sat
}

fn number_satisfied(n: &Number, condition: &Condition) -> bool {
    let Some(d) = decimal_from_number(n) else {
        warn!(field = %condition.field, value = %n, "number cannot be parsed as a decimal");
        return true;
    };

    let cmp = |bound: &Option<BigDecimal>, ok: fn(Ordering) -> bool| match bound {
        Some(b) => ok(d.cmp(b)),
        None => true,
    };

    let mut sat = true;
    if let Some(Operand::Number(v)) = &condition.eq {
        sat &= d == *v;
    }
    if let Some(Operand::Number(v)) = &condition.ne {
        sat &= d != *v;
    }
    sat &= cmp(&condition.lt, Ordering::is_lt);
    sat &= cmp(&condition.le, Ordering::is_le);
    sat &= cmp(&condition.gt, Ordering::is_gt);
    sat &= cmp(&condition.ge, Ordering::is_ge);
    sat
}
