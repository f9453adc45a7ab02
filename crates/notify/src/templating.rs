//! Minijinja template rendering for alert messages.
//!
//! Renders webhook bodies and email subjects/bodies with access to the rule
//! name and the extracted records.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use chrono::Utc;
use stupid_core::Record;

use crate::traits::NotifyError;

/// Subject used by email channels without a configured subject.
pub const DEFAULT_SUBJECT_TEMPLATE: &str = "Alert: {{ rule_name }}";

/// Plain-text body listing every record.
pub const DEFAULT_BODY_TEMPLATE: &str = "\
Rule '{{ rule_name }}' triggered at {{ now }}.
{% for r in records %}
== {{ r.filter }} ==
{% for f in r.fields or [] %}{{ f.key }}: {{ f.doc_count }}
{% endfor %}{% if r.text is defined %}{{ r.text }}
{% endif %}{% endfor %}";

/// Context data available to alert templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext<'a> {
    pub rule_name: &'a str,
    /// Records as they appear on the wire (`filter`, `text`, `fields`).
    pub records: &'a [Record],
    pub record_count: usize,
    /// Current timestamp in RFC 3339 format.
    pub now: String,
}

impl<'a> TemplateContext<'a> {
    pub fn new(rule_name: &'a str, records: &'a [Record]) -> Self {
        Self {
            rule_name,
            records,
            record_count: records.len(),
            now: Utc::now().to_rfc3339(),
        }
    }
}

/// Renders alert templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();

        // `lower` and `upper` are built-in with the "builtins" feature,
        // but we register explicit versions to guarantee availability.
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);

        // Register global `env()` function for environment variable access
        env.add_function("env", env_function);

        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &TemplateContext<'_>) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    ///
    /// This does not evaluate the template, it only checks syntax.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom filter: lowercase a string.
fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

/// Custom filter: uppercase a string.
fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Global function: read an environment variable by name.
///
/// Returns the variable value, or an empty string if not found
/// (with a warning logged via tracing).
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}
