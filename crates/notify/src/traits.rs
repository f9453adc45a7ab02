//! Channel trait definition and shared error types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stupid_core::Record;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Wire shape shared by the file channel and the default webhook body.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload<'a> {
    pub rule_name: &'a str,
    pub received_at: DateTime<Utc>,
    pub results: &'a [Record],
}

impl<'a> AlertPayload<'a> {
    pub fn new(rule_name: &'a str, results: &'a [Record]) -> Self {
        Self {
            rule_name,
            received_at: Utc::now(),
            results,
        }
    }
}

/// Trait for notification channel implementations.
///
/// Deliveries may be retried, so implementations must tolerate receiving the
/// same alert more than once.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    /// Deliver the records of one triggered rule through this channel.
    async fn deliver(&self, rule_name: &str, records: &[Record]) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook", "email").
    fn channel_name(&self) -> &str;
}
