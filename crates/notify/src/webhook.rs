//! Generic HTTP webhook channel.
//!
//! Delivers alerts as JSON payloads to configured webhook URLs with optional
//! custom headers and request body templates.

use std::collections::HashMap;
use std::sync::Arc;

use stupid_core::Record;

use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::{AlertPayload, Channel, NotifyError};

/// Delivers alerts as JSON over HTTP to a configured endpoint.
///
/// Supports configurable HTTP method, custom headers, and optional
/// body templates rendered via [`TemplateRenderer`]. Environment
/// variable references (`${VAR_NAME}`) in the URL and header values
/// are resolved at construction time.
#[derive(Debug)]
pub struct WebhookChannel {
    /// Target URL (env vars already resolved).
    url: String,
    method: reqwest::Method,
    headers: HashMap<String, String>,
    /// Optional minijinja body template. When unset the alert is sent as
    /// `{"rule_name", "received_at", "results"}`.
    body_template: Option<String>,
    renderer: Arc<TemplateRenderer>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Create a new webhook channel.
    ///
    /// Environment variable references (`${VAR_NAME}`) in `url` and
    /// header values are resolved eagerly. Missing env vars produce
    /// a [`NotifyError::Config`] error.
    ///
    /// `method` defaults to `POST` when `None`.
    pub fn new(
        url: String,
        method: Option<reqwest::Method>,
        headers: HashMap<String, String>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
        client: reqwest::Client,
    ) -> Result<Self, NotifyError> {
        let resolved_url = resolve_env_vars(&url)?;

        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        // Validate body template syntax at construction time.
        if let Some(ref tmpl) = body_template {
            renderer
                .validate(tmpl)
                .map_err(|e| NotifyError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Self {
            url: resolved_url,
            method: method.unwrap_or(reqwest::Method::POST),
            headers: resolved_headers,
            body_template,
            renderer,
            client,
        })
    }

    /// Construct a [`WebhookChannel`] from rule-level primitives.
    ///
    /// `method` is parsed from a string (e.g. `"POST"`, `"PUT"`).
    /// Invalid method strings produce [`NotifyError::Config`].
    pub fn from_config(
        url: String,
        method: Option<String>,
        headers: HashMap<String, String>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
        client: reqwest::Client,
    ) -> Result<Self, NotifyError> {
        let parsed_method = match method {
            Some(m) => {
                let upper = m.to_uppercase();
                upper
                    .parse::<reqwest::Method>()
                    .map(Some)
                    .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?
            }
            None => None,
        };

        Self::new(url, parsed_method, headers, body_template, renderer, client)
    }

    fn render_body(&self, rule_name: &str, records: &[Record]) -> Result<String, NotifyError> {
        match &self.body_template {
            Some(tmpl) => self
                .renderer
                .render(tmpl, &TemplateContext::new(rule_name, records)),
            None => Ok(serde_json::to_string(&AlertPayload::new(rule_name, records))?),
        }
    }
}

#[async_trait::async_trait]
impl Channel for WebhookChannel {
    async fn deliver(&self, rule_name: &str, records: &[Record]) -> Result<(), NotifyError> {
        let body = self.render_body(rule_name, records)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            url = %self.url,
            method = %self.method,
            status = %status,
            rule = %rule_name,
            "webhook alert delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            // Consume the '{'
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name).map_err(|_| {
                NotifyError::Config(format!("env var not found: {var_name}"))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
