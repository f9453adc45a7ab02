use serde::{Deserialize, Serialize};

/// Title given to the record that carries raw `_source` documents.
pub const RAW_HITS_TITLE: &str = "hits.hits._source";

/// A single aggregated key/count pair.
///
/// `key` may be a ` - ` joined lineage of ancestor bucket keys
/// (e.g. `"eu-west - checkout"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    #[serde(rename = "doc_count")]
    pub count: u64,
}

impl Field {
    /// Build a field, refusing empty keys and zero counts.
    pub fn new(key: impl Into<String>, count: u64) -> Option<Self> {
        let key = key.into();
        if key.is_empty() || count == 0 {
            return None;
        }
        Some(Self { key, count })
    }
}

/// One unit of alert content: either bucket counts or a raw text dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Filter path the record was extracted from, or [`RAW_HITS_TITLE`].
    #[serde(rename = "filter")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

impl Record {
    pub fn with_fields(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            text: None,
            fields,
        }
    }

    pub fn with_text(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: Some(text.into()),
            fields: Vec::new(),
        }
    }
}
