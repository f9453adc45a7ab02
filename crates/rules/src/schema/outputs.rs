//! Output (notification channel) configuration types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One channel a triggered alert is delivered to.
///
/// Written as `{"type": "<kind>", "config": {...}}` in rule files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Append one JSON line per alert to a local file.
    File { file: String },
    Webhook {
        url: String,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        body_template: Option<String>,
    },
    Email {
        smtp_host: String,
        #[serde(default)]
        smtp_port: Option<u16>,
        #[serde(default)]
        tls: Option<bool>,
        from: String,
        to: Vec<String>,
        #[serde(default)]
        subject: Option<String>,
    },
}

impl OutputConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            OutputConfig::File { .. } => "file",
            OutputConfig::Webhook { .. } => "webhook",
            OutputConfig::Email { .. } => "email",
        }
    }
}
