//! Trigger condition DSL.
//!
//! ```yaml
//! conditions:
//!   - field: aggregations.errors.buckets.doc_count
//!     quantifier: any
//!     ge: 10
//! ```

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::{Map, Number, Value};

/// Operators that only accept numeric operands.
pub const NUMERIC_OPERATORS: [&str; 4] = ["le", "lt", "gt", "ge"];
/// Operators that accept string, number or boolean operands.
pub const EQUALITY_OPERATORS: [&str; 2] = ["eq", "ne"];

/// How many of the values found at a condition's path must satisfy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantifier {
    #[default]
    Any,
    All,
    None,
}

impl Quantifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantifier::Any => "any",
            Quantifier::All => "all",
            Quantifier::None => "none",
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quantifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Quantifier::Any),
            "all" => Ok(Quantifier::All),
            "none" => Ok(Quantifier::None),
            _ => Err(()),
        }
    }
}

/// Operand of `eq` / `ne`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Number(BigDecimal),
    Bool(bool),
}

/// A validated condition. Every present operator must hold for a value to
/// satisfy it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    pub field: String,
    pub quantifier: Quantifier,
    pub eq: Option<Operand>,
    pub ne: Option<Operand>,
    pub lt: Option<BigDecimal>,
    pub le: Option<BigDecimal>,
    pub gt: Option<BigDecimal>,
    pub ge: Option<BigDecimal>,
}

impl Condition {
    /// Parse a raw condition object, collecting every problem found.
    pub fn parse(raw: &Value) -> Result<Condition, Vec<String>> {
        let Value::Object(map) = raw else {
            return Err(vec!["condition must be an object".to_string()]);
        };

        let mut errors = Vec::new();
        let mut condition = Condition::default();

        match map.get("field") {
            None => errors.push("condition must have the field 'field'".to_string()),
            Some(Value::String(f)) if !f.is_empty() => condition.field = f.clone(),
            Some(_) => errors.push("field 'field' of condition must not be empty".to_string()),
        }

        match map.get("quantifier") {
            None => {}
            Some(Value::String(q)) => match q.parse() {
                Ok(q) => condition.quantifier = q,
                Err(()) => errors.push(
                    "field 'quantifier' of condition must either be 'any', 'all', or 'none'"
                        .to_string(),
                ),
            },
            Some(_) => errors.push("field 'quantifier' of condition must be a string".to_string()),
        }

        for op in NUMERIC_OPERATORS {
            match numeric_operand(map, op) {
                Ok(Some(d)) => match op {
                    "le" => condition.le = Some(d),
                    "lt" => condition.lt = Some(d),
                    "gt" => condition.gt = Some(d),
                    _ => condition.ge = Some(d),
                },
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        for op in EQUALITY_OPERATORS {
            match equality_operand(map, op) {
                Ok(Some(operand)) if op == "eq" => condition.eq = Some(operand),
                Ok(Some(operand)) => condition.ne = Some(operand),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(condition)
        } else {
            Err(errors)
        }
    }

    pub fn has_operators(&self) -> bool {
        self.eq.is_some()
            || self.ne.is_some()
            || self.lt.is_some()
            || self.le.is_some()
            || self.gt.is_some()
            || self.ge.is_some()
    }
}

fn numeric_operand(map: &Map<String, Value>, op: &str) -> Result<Option<BigDecimal>, String> {
    match map.get(op) {
        None => Ok(None),
        Some(Value::Number(n)) => decimal_from_number(n)
            .map(Some)
            .ok_or_else(|| format!("value of operator '{op}' is not a representable decimal")),
        Some(_) => Err(format!("value of operator '{op}' should be a number")),
    }
}

fn equality_operand(map: &Map<String, Value>, op: &str) -> Result<Option<Operand>, String> {
    match map.get(op) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => {
            Err(format!("value of operator '{op}' should not be empty"))
        }
        Some(Value::String(s)) => Ok(Some(Operand::Text(s.clone()))),
        Some(Value::Bool(b)) => Ok(Some(Operand::Bool(*b))),
        Some(Value::Number(n)) => decimal_from_number(n)
            .map(|d| Some(Operand::Number(d)))
            .ok_or_else(|| format!("value of operator '{op}' is not a representable decimal")),
        Some(_) => Err(format!(
            "value of operator '{op}' should either be a number, a string, or a boolean"
        )),
    }
}

/// Exact decimal for a JSON number, via its shortest textual form so that
/// `0.1` stays `0.1` rather than the nearest binary float. Any magnitude and
/// scale is held, including `1e30`.
pub fn decimal_from_number(n: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&n.to_string()).ok()
}
