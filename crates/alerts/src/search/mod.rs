//! Query engine abstraction.

pub mod elasticsearch;

use serde_json::Value;

pub use elasticsearch::ElasticsearchClient;

/// Transient failure of one query. The cycle is skipped, the job keeps going.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot decode search response: {0}")]
    Decode(String),
}

/// Executes a rule's query body against an index.
#[async_trait::async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run `body` against `index` and return the decoded JSON response.
    async fn search(&self, index: &str, body: &Value) -> Result<Value, QueryError>;
}
