//! Output channel checks: required fields, URL schemes, secret detection.

use crate::schema::{OutputConfig, RuleFile};

use super::ValidationResult;

pub(super) fn validate_outputs(file: &RuleFile, result: &mut ValidationResult) {
    if file.outputs.is_empty() {
        result.error("outputs", "At least one output must be configured");
        return;
    }

    for (i, output) in file.outputs.iter().enumerate() {
        let path = format!("outputs[{i}].config");
        match output {
            OutputConfig::File { file } => {
                if file.trim().is_empty() {
                    result.error(format!("{path}.file"), "File output requires 'file'");
                }
            }
            OutputConfig::Webhook {
                url,
                method,
                headers,
                ..
            } => {
                if !url.starts_with("http://")
                    && !url.starts_with("https://")
                    && !url.starts_with("${")
                {
                    result.error(
                        format!("{path}.url"),
                        format!("URL must start with http:// or https://, got '{url}'"),
                    );
                }
                if let Some(m) = method {
                    let upper = m.to_uppercase();
                    if !["GET", "POST", "PUT", "PATCH"].contains(&upper.as_str()) {
                        result.error(
                            format!("{path}.method"),
                            format!("Unsupported HTTP method '{m}'"),
                        );
                    }
                }
                for (name, value) in headers {
                    check_secret_value(value, &format!("{path}.headers.{name}"), result);
                }
            }
            OutputConfig::Email {
                smtp_host, from, to, ..
            } => {
                if smtp_host.trim().is_empty() {
                    result.error(format!("{path}.smtp_host"), "Email output requires 'smtp_host'");
                }
                if from.trim().is_empty() {
                    result.error(format!("{path}.from"), "Email output requires 'from'");
                }
                if to.is_empty() {
                    result.error(format!("{path}.to"), "Email output requires at least one recipient");
                }
            }
        }
    }
}

/// Warn if a value looks like a raw secret instead of `${ENV_VAR}` reference.
fn check_secret_value(value: &str, path: &str, result: &mut ValidationResult) {
    if !value.is_empty() && !value.contains("${") && looks_like_secret(value) {
        result.warn(
            path,
            "Value looks like a raw secret. Consider using '${ENV_VAR}' syntax instead",
        );
    }
}

/// Heuristic: a value "looks like" a secret if it's long enough with mixed chars
/// and doesn't look like a normal URL or text.
fn looks_like_secret(v: &str) -> bool {
    if v.starts_with("http://") || v.starts_with("https://") {
        return false;
    }
    let token = v.rsplit(' ').next().unwrap_or(v);
    if token.len() >= 20 {
        let has_alpha = token.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        return has_alpha && has_digit;
    }
    false
}
