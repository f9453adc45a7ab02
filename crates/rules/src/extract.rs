//! Turn a raw search response into alert [`Record`]s.
//!
//! Each filter path produces at most one record of keyed counts decoded from
//! aggregation buckets. Independently, every raw document found at the body
//! field is pretty-printed into a single trailing text record. The body field
//! names a document list and a per-document key (`hits.hits` and `_source`);
//! when the list is absent or not an array there is no text record.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use stupid_core::{Field, Record, RAW_HITS_TITLE};

use crate::jsonpath::{get_all, Match};

/// Separator placed between pretty-printed raw documents.
pub const HITS_DELIMITER: &str = "\n----------------------------------------\n";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot decode bucket at '{filter}': {reason}")]
    BucketDecode { filter: String, reason: String },

    #[error("cannot serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Extract records using the default raw-document path `hits.hits._source`.
pub fn extract(response: &Value, filters: &[String]) -> Result<Vec<Record>, ExtractError> {
    extract_with_body_field(response, filters, RAW_HITS_TITLE)
}

/// Extract bucket records for `filters`, then the raw-document record found
/// at `body_field`.
pub fn extract_with_body_field(
    response: &Value,
    filters: &[String],
    body_field: &str,
) -> Result<Vec<Record>, ExtractError> {
    let mut records = Vec::new();

    for filter in filters {
        let mut fields = Vec::new();
        for found in get_all(response, filter) {
            let Value::Object(bucket) = found.value else {
                continue;
            };
            if let Some(field) = decode_bucket(filter, &found, bucket)? {
                fields.push(field);
            }
        }
        if !fields.is_empty() {
            records.push(Record::with_fields(filter.clone(), fields));
        }
    }

    if let Some(text) = render_documents(response, body_field)? {
        records.push(Record::with_text(body_field, text));
    }

    Ok(records)
}

/// Decode one `{"key", "doc_count"}` bucket. Buckets without a usable key or
/// with a non-positive count yield `None`.
fn decode_bucket(
    filter: &str,
    found: &Match<'_>,
    bucket: &Map<String, Value>,
) -> Result<Option<Field>, ExtractError> {
    let decode_err = |reason: String| ExtractError::BucketDecode {
        filter: filter.to_string(),
        reason,
    };

    let key = match bucket.get("key") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(decode_err(format!(
                "'key' must be a string or number, got {other}"
            )))
        }
    };
    if key.is_empty() {
        return Ok(None);
    }

    let count = match bucket.get("doc_count") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => {
            if let Some(c) = n.as_u64() {
                c
            } else if n.as_i64().is_some() {
                // Negative counts are never reported.
                return Ok(None);
            } else {
                return Err(decode_err(format!("'doc_count' must be an integer, got {n}")));
            }
        }
        Some(other) => {
            return Err(decode_err(format!(
                "'doc_count' must be an integer, got {other}"
            )))
        }
    };

    Ok(Field::new(found.qualify(&key), count))
}

fn render_documents(response: &Value, body_field: &str) -> Result<Option<String>, ExtractError> {
    let (list_path, doc_key) = match body_field.rsplit_once('.') {
        Some((list, key)) => (list, Some(key)),
        None => (body_field, None),
    };
    let list = list_path
        .split('.')
        .try_fold(response, |value, key| value.get(key));
    let Some(Value::Array(hits)) = list else {
        return Ok(None);
    };

    let mut rendered = Vec::new();
    for hit in hits {
        let doc = match doc_key {
            Some(key) => hit.get(key),
            None => Some(hit),
        };
        if let Some(doc @ Value::Object(_)) = doc {
            rendered.push(to_pretty_json(doc)?);
        }
    }
    if rendered.is_empty() {
        return Ok(None);
    }
    Ok(Some(rendered.join(HITS_DELIMITER)))
}

fn to_pretty_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn one_level_buckets_become_fields_in_order() {
        let resp = json!({"aggregations": {"hosts": {"buckets": [
            {"key": "alpha", "doc_count": 4},
            {"key": "beta", "doc_count": 0},
            {"key": "gamma", "doc_count": 2}
        ]}}});
        let records = extract(&resp, &filters(&["aggregations.hosts.buckets"])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "aggregations.hosts.buckets");
        let fields: Vec<_> = records[0].fields.iter().map(|f| (f.key.as_str(), f.count)).collect();
        assert_eq!(fields, vec![("alpha", 4), ("gamma", 2)]);
        assert!(records[0].text.is_none());
    }

    #[test]
    fn nested_buckets_join_keys_outer_then_inner() {
        let resp = json!({"aggregations": {"service": {"buckets": [
            {"key": "api", "status": {"buckets": [
                {"key": "500", "doc_count": 7},
                {"key": "503", "doc_count": 1}
            ]}},
            {"key": "web", "status": {"buckets": [
                {"key": "404", "doc_count": 2}
            ]}}
        ]}}});
        let path = "aggregations.service.buckets.status.buckets";
        let records = extract(&resp, &filters(&[path])).unwrap();
        let keys: Vec<_> = records[0].fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["api - 500", "api - 503", "web - 404"]);
    }

    #[test]
    fn numeric_keys_are_stringified() {
        let resp = json!({"by_code": {"buckets": [{"key": 404, "doc_count": 3}]}});
        let records = extract(&resp, &filters(&["by_code.buckets"])).unwrap();
        assert_eq!(records[0].fields[0].key, "404");
    }

    #[test]
    fn filters_without_fields_produce_no_record() {
        let resp = json!({"aggregations": {"hosts": {"buckets": []}}});
        let records = extract(&resp, &filters(&["aggregations.hosts.buckets", "nope"])).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn fractional_doc_count_is_a_decode_error() {
        let resp = json!({"b": {"buckets": [{"key": "x", "doc_count": 1.5}]}});
        let err = extract(&resp, &filters(&["b.buckets"])).unwrap_err();
        assert!(matches!(err, ExtractError::BucketDecode { .. }));
    }

    #[test]
    fn hits_are_pretty_printed_and_joined() {
        let resp = json!({"hits": {"hits": [
            {"_source": {"user": "a"}},
            {"_id": "no-source"},
            {"_source": {"user": "b"}}
        ]}});
        let records = extract(&resp, &[]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, RAW_HITS_TITLE);
        let expected = format!(
            "{{\n    \"user\": \"a\"\n}}{HITS_DELIMITER}{{\n    \"user\": \"b\"\n}}"
        );
        assert_eq!(records[0].text.as_deref(), Some(expected.as_str()));
        assert!(records[0].fields.is_empty());
    }

    #[test]
    fn empty_hits_produce_no_text_record() {
        let resp = json!({"hits": {"hits": []}});
        assert!(extract(&resp, &[]).unwrap().is_empty());
        let resp = json!({"hits": {"total": 0}});
        assert!(extract(&resp, &[]).unwrap().is_empty());
    }

    #[test]
    fn hits_that_are_not_an_array_produce_no_text_record() {
        let resp = json!({"hits": {"hits": {"_source": {"user": "a"}}}});
        assert!(extract(&resp, &[]).unwrap().is_empty());
        let resp = json!({"hits": {"hits": "none"}});
        assert!(extract(&resp, &[]).unwrap().is_empty());
    }

    #[test]
    fn hits_record_follows_bucket_records() {
        let resp = json!({
            "hits": {"hits": [{"_source": {"n": 1}}]},
            "aggregations": {"x": {"buckets": [{"key": "k", "doc_count": 1}]}}
        });
        let records = extract(&resp, &filters(&["aggregations.x.buckets"])).unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["aggregations.x.buckets", RAW_HITS_TITLE]);
    }

    #[test]
    fn custom_body_field() {
        let resp = json!({"docs": [{"a": 1}]});
        let records = extract_with_body_field(&resp, &[], "docs").unwrap();
        assert_eq!(records[0].title, "docs");
    }
}
