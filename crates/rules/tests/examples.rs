//! Integration tests that load every example rule in `data/rules/examples/`
//! and run it against a representative search response.

use serde_json::json;
use stupid_rules::schema::{OutputConfig, Quantifier};
use stupid_rules::{evaluate, extract_with_body_field, Rule, RuleLoader};

/// Resolve the examples directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn examples_dir() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/rules/examples")
}

fn load_rule(name: &str) -> Rule {
    RuleLoader::new(examples_dir())
        .load_all()
        .unwrap_or_else(|e| panic!("examples failed to load: {e}"))
        .into_iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no example rule named '{name}'"))
}

#[test]
fn every_example_loads() {
    let rules = RuleLoader::new(examples_dir()).load_all().unwrap();
    let mut names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Error Spike By Host", "Failed Logins"]);
}

// ── error-spike-by-host.yml ─────────────────────────────────

#[test]
fn parse_error_spike_example() {
    let rule = load_rule("Error Spike By Host");

    assert_eq!(rule.index, "logs-app-*");
    assert_eq!(rule.schedule, "0 */5 * * * *");
    assert_eq!(rule.body_field, "hits.hits._source");
    assert_eq!(rule.body["size"], json!(0));
    assert_eq!(rule.filters, vec!["aggregations.service.buckets.host.buckets"]);

    assert_eq!(rule.conditions.len(), 1);
    assert_eq!(rule.conditions[0].quantifier, Quantifier::Any);

    let kinds: Vec<&str> = rule.outputs.iter().map(OutputConfig::kind).collect();
    assert_eq!(kinds, vec!["webhook", "file"]);
}

#[test]
fn error_spike_extracts_nested_buckets() {
    let rule = load_rule("Error Spike By Host");
    let response = json!({
        "hits": {"total": {"value": 412}, "hits": []},
        "aggregations": {"service": {"buckets": [
            {"key": "checkout", "doc_count": 300, "host": {"buckets": [
                {"key": "web-1", "doc_count": 230},
                {"key": "web-2", "doc_count": 70}
            ]}},
            {"key": "search", "doc_count": 112, "host": {"buckets": [
                {"key": "web-3", "doc_count": 112}
            ]}}
        ]}}
    });

    let records = extract_with_body_field(&response, &rule.filters, &rule.body_field).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "aggregations.service.buckets.host.buckets");
    let fields: Vec<(&str, u64)> = records[0]
        .fields
        .iter()
        .map(|f| (f.key.as_str(), f.count))
        .collect();
    assert_eq!(
        fields,
        vec![("checkout - web-1", 230), ("checkout - web-2", 70), ("search - web-3", 112)]
    );

    assert!(evaluate(&response, &rule.conditions));
}

#[test]
fn error_spike_quiet_hosts_do_not_trigger() {
    let rule = load_rule("Error Spike By Host");
    let response = json!({
        "aggregations": {"service": {"buckets": [
            {"key": "checkout", "doc_count": 12, "host": {"buckets": [
                {"key": "web-1", "doc_count": 12}
            ]}}
        ]}}
    });

    assert!(!evaluate(&response, &rule.conditions));
}

// ── failed-logins.json ──────────────────────────────────────

#[test]
fn parse_failed_logins_example() {
    let rule = load_rule("Failed Logins");

    assert_eq!(rule.schedule, "0 */10 * * * *");
    assert!(rule.filters.is_empty());
    assert_eq!(rule.conditions.len(), 2);
    assert_eq!(rule.conditions[1].quantifier, Quantifier::None);

    match &rule.outputs[0] {
        OutputConfig::Email { smtp_port, to, subject, .. } => {
            assert_eq!(*smtp_port, Some(587));
            assert_eq!(to, &vec!["security@example.com".to_string()]);
            assert!(subject.as_deref().unwrap().contains("{{ rule_name }}"));
        }
        other => panic!("expected email output, got {other:?}"),
    }
}

#[test]
fn failed_logins_dumps_raw_documents() {
    let rule = load_rule("Failed Logins");
    let response = json!({"hits": {"total": {"value": 6}, "hits": [
        {"_source": {"user": {"name": "alice", "disabled": false}}},
        {"_source": {"user": {"name": "bob", "disabled": false}}}
    ]}});

    let records = extract_with_body_field(&response, &rule.filters, &rule.body_field).unwrap();
    assert_eq!(records.len(), 1);
    let text = records[0].text.as_deref().unwrap();
    assert!(text.contains("alice") && text.contains("bob"));
    assert!(text.contains("\n----------------------------------------\n"));

    assert!(evaluate(&response, &rule.conditions));
}

#[test]
fn failed_logins_ignores_disabled_accounts() {
    let rule = load_rule("Failed Logins");
    let response = json!({"hits": {"total": {"value": 9}, "hits": [
        {"_source": {"user": {"name": "svc-backup", "disabled": true}}}
    ]}});

    assert!(!evaluate(&response, &rule.conditions));
}
