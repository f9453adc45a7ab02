//! Dotted-path traversal over search responses.
//!
//! A path such as `aggregations.hosts.buckets` descends objects key by key.
//! When an array is met before the path is exhausted, traversal fans out over
//! its elements, threading each element's string `key` into a lineage
//! (`"outer - inner"`). This is the subset needed for nested terms
//! aggregations; indices, wildcards and filters are not supported.

use serde_json::Value;

/// Separator placed between bucket keys of nested aggregation levels.
pub const LINEAGE_SEPARATOR: &str = " - ";

/// A value found at the end of a path together with the bucket lineage that
/// led to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub lineage: String,
    pub value: &'a Value,
}

impl Match<'_> {
    /// Prefix `key` with this match's lineage.
    pub fn qualify(&self, key: &str) -> String {
        join_lineage(&self.lineage, key)
    }
}

/// Join a lineage and a key, skipping the separator when either side is empty.
pub fn join_lineage(lineage: &str, key: &str) -> String {
    match (lineage.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => lineage.to_string(),
        (false, false) => format!("{lineage}{LINEAGE_SEPARATOR}{key}"),
    }
}

/// Collect every value at `path` in traversal order.
///
/// An array at path exhaustion contributes its elements. Missing keys and
/// type mismatches yield nothing; `null` leaves are skipped.
pub fn get_all<'a>(root: &'a Value, path: &str) -> Vec<Match<'a>> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    walk(root, &segments, String::new(), &mut out);
    out
}

fn walk<'a>(value: &'a Value, segments: &[&str], lineage: String, out: &mut Vec<Match<'a>>) {
    let Some((head, rest)) = segments.split_first() else {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    out.push(Match {
                        lineage: lineage.clone(),
                        value: item,
                    });
                }
            }
            other => out.push(Match {
                lineage,
                value: other,
            }),
        }
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                walk(next, rest, lineage, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                let item_lineage = match item.get("key").and_then(Value::as_str) {
                    Some(key) => join_lineage(&lineage, key),
                    None => lineage.clone(),
                };
                walk(item, segments, item_lineage, out);
            }
        }
        _ => {}
    }
}
