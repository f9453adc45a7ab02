//! Rule file schema types with serde deserialization.
//!
//! - `RuleFile`: the document as written on disk (JSON or YAML)
//! - `Rule`: a validated rule with parsed conditions and a normalized schedule
//! - `Condition`: one clause of the trigger DSL
//! - `OutputConfig`: per-channel delivery configuration

mod condition;
mod outputs;
mod rule;

pub use condition::*;
pub use outputs::*;
pub use rule::*;
