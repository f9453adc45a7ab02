//! Elasticsearch client: rule queries plus the next-fire state indices.
//!
//! State documents are appended to daily indices named
//! `<alias>-status-<version>-YYYY.MM.DD` (via date math) and read back through
//! an alias installed by an index template. The newest `next_query` of a rule
//! wins.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use stupid_core::config::ElasticsearchConfig;
use stupid_core::StupidError;
use tracing::{debug, info};

use super::{QueryError, SearchEngine};
use crate::state::{state_key, ScheduleStateStore, StateError};

/// Bumped whenever the state document mapping changes.
pub const TEMPLATE_VERSION: &str = "0.0.1";

const NEXT_QUERY_FILTER: &str = "hits.hits._source.next_query";

pub struct ElasticsearchClient {
    base: Url,
    client: reqwest::Client,
    state_alias: String,
    hostname: String,
}

impl ElasticsearchClient {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, StupidError> {
        let base = Url::parse(&config.url)
            .map_err(|e| StupidError::Config(format!("invalid ELASTICSEARCH_URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StupidError::Config(format!(
                "ELASTICSEARCH_URL is not a base URL: {}",
                config.redacted_url()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StupidError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base,
            client,
            state_alias: config.state_alias.clone(),
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
        })
    }

    pub fn template_name(&self) -> String {
        format!("{}-{}", self.state_alias, TEMPLATE_VERSION)
    }

    /// Date-math index name for today's state index.
    pub fn state_index(&self) -> String {
        format!("<{}-status-{}-{{now/d}}>", self.state_alias, TEMPLATE_VERSION)
    }

    /// Index template that puts every state index behind the alias.
    pub fn template_body(&self) -> Value {
        let mut aliases = serde_json::Map::new();
        aliases.insert(self.template_name(), json!({}));
        json!({
            "index_patterns": [format!("{}-status-{}-*", self.state_alias, TEMPLATE_VERSION)],
            "template": {
                "aliases": aliases,
                "settings": {
                    "index": {
                        "sort": {
                            "field": ["next_query", "rule_name", "hostname"],
                            "order": ["desc", "desc", "desc"]
                        }
                    }
                },
                "mappings": {
                    "dynamic_templates": [{
                        "strings_as_keywords": {
                            "match_mapping_type": "string",
                            "mapping": { "type": "keyword" }
                        }
                    }],
                    "properties": {
                        "@timestamp": { "type": "date" },
                        "rule_name": { "type": "keyword" },
                        "next_query": { "type": "date" },
                        "hostname": { "type": "keyword" },
                        "hits_count": { "type": "long", "null_value": 0 }
                    }
                }
            }
        })
    }

    /// Install (or overwrite) the state index template.
    pub async fn ensure_state_template(&self) -> Result<(), StateError> {
        let name = self.template_name();
        let url = self.endpoint(&["_index_template", &name]);
        let response = self
            .client
            .put(url)
            .json(&self.template_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: Value = response
            .json()
            .await
            .map_err(|e| StateError::Decode(e.to_string()))?;
        match ack.get("acknowledged").and_then(Value::as_bool) {
            Some(true) => {
                info!(template = %name, "state index template installed");
                Ok(())
            }
            Some(false) => Err(StateError::Decode(format!(
                "template '{name}' was not acknowledged"
            ))),
            None => Err(StateError::Decode(
                "response has no boolean 'acknowledged' field".to_string(),
            )),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Query that selects the newest state document of one rule.
fn next_fire_query(rule: &str) -> Value {
    json!({
        "query": { "bool": { "must": [
            { "term": { "rule_name": { "value": state_key(rule) } } }
        ] } },
        "sort": [{ "next_query": { "order": "desc" } }],
        "size": 1
    })
}

#[async_trait::async_trait]
impl SearchEngine for ElasticsearchClient {
    async fn search(&self, index: &str, body: &Value) -> Result<Value, QueryError> {
        let url = self.endpoint(&[index, "_search"]);
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| QueryError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ScheduleStateStore for ElasticsearchClient {
    async fn next_fire(&self, rule: &str) -> Result<Option<DateTime<Utc>>, StateError> {
        let alias = self.template_name();
        let mut url = self.endpoint(&[&alias, "_search"]);
        url.query_pairs_mut()
            .append_pair("filter_path", NEXT_QUERY_FILTER);

        let response = self
            .client
            .post(url)
            .json(&next_fire_query(rule))
            .send()
            .await?;

        let status = response.status();
        // The alias only exists once the first state document was written.
        if status == StatusCode::NOT_FOUND {
            debug!(rule = %rule, alias = %alias, "state alias not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| StateError::Decode(e.to_string()))?;
        let Some(raw) = data.pointer("/hits/hits/0/_source/next_query") else {
            return Ok(None);
        };
        let raw = raw
            .as_str()
            .ok_or_else(|| StateError::Decode(format!("next_query is not a string: {raw}")))?;
        let at = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| StateError::Decode(format!("next_query '{raw}': {e}")))?;
        Ok(Some(at.with_timezone(&Utc)))
    }

    async fn set_next_fire(
        &self,
        rule: &str,
        at: DateTime<Utc>,
        hits_count: u64,
    ) -> Result<(), StateError> {
        let index = self.state_index();
        let url = self.endpoint(&[&index, "_doc"]);
        let doc = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "rule_name": state_key(rule),
            "next_query": at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "hostname": self.hostname,
            "hits_count": hits_count,
        });

        let response = self.client.post(url).json(&doc).send().await?;
        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(StateError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(rule = %rule, next_fire = %at, "next fire persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use httpmock::Method::{POST, PUT};
    use httpmock::MockServer;

    fn client_for(server: &MockServer) -> ElasticsearchClient {
        let config = ElasticsearchConfig {
            url: server.base_url(),
            state_alias: "stupid-alerts".to_string(),
            timeout_secs: 5,
            maintain_state: true,
        };
        ElasticsearchClient::new(&config).unwrap()
    }

    #[test]
    fn names_follow_alias_and_version() {
        let config = ElasticsearchConfig {
            url: "http://localhost:9200".to_string(),
            state_alias: "ops".to_string(),
            timeout_secs: 5,
            maintain_state: true,
        };
        let es = ElasticsearchClient::new(&config).unwrap();
        assert_eq!(es.template_name(), "ops-0.0.1");
        assert_eq!(es.state_index(), "<ops-status-0.0.1-{now/d}>");
        assert_eq!(
            es.template_body()["index_patterns"][0],
            json!("ops-status-0.0.1-*")
        );
        assert!(es.template_body()["template"]["aliases"]["ops-0.0.1"].is_object());
    }

    #[test]
    fn state_index_path_is_escaped() {
        let config = ElasticsearchConfig {
            url: "http://localhost:9200/".to_string(),
            state_alias: "ops".to_string(),
            timeout_secs: 5,
            maintain_state: true,
        };
        let es = ElasticsearchClient::new(&config).unwrap();
        let url = es.endpoint(&[&es.state_index(), "_doc"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:9200/%3Cops-status-0.0.1-%7Bnow%2Fd%7D%3E/_doc"
        );
    }

    #[test]
    fn next_fire_query_uses_cleaned_name() {
        let q = next_fire_query("Nightly Errors");
        assert_eq!(
            q["query"]["bool"]["must"][0]["term"]["rule_name"]["value"],
            json!("nightly-errors")
        );
        assert_eq!(q["size"], json!(1));
    }

    #[tokio::test]
    async fn search_returns_decoded_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/logs-app/_search");
                then.status(200)
                    .json_body(json!({"hits": {"total": {"value": 0}, "hits": []}}));
            })
            .await;

        let es = client_for(&server);
        let resp = es
            .search("logs-app", &json!({"query": {"match_all": {}}}))
            .await
            .unwrap();
        assert_eq!(resp["hits"]["total"]["value"], json!(0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_non_success_is_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/missing/_search");
                then.status(404).body("index_not_found_exception");
            })
            .await;

        let err = client_for(&server)
            .search("missing", &json!({}))
            .await
            .unwrap_err();
        match err {
            QueryError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("index_not_found"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn next_fire_reads_latest_document() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/stupid-alerts-0.0.1/_search")
                    .query_param("filter_path", NEXT_QUERY_FILTER)
                    .body_contains("\"nightly-errors\"");
                then.status(200).json_body(json!({
                    "hits": {"hits": [{"_source": {"next_query": "2026-03-01T12:30:00Z"}}]}
                }));
            })
            .await;

        let at = client_for(&server)
            .next_fire("Nightly Errors")
            .await
            .unwrap();
        assert_eq!(at, Some(Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn next_fire_without_documents_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/stupid-alerts-0.0.1/_search");
                then.status(200).json_body(json!({}));
            })
            .await;

        assert_eq!(client_for(&server).next_fire("r").await.unwrap(), None);
    }

    #[tokio::test]
    async fn next_fire_missing_alias_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/stupid-alerts-0.0.1/_search");
                then.status(404);
            })
            .await;

        assert_eq!(client_for(&server).next_fire("r").await.unwrap(), None);
    }

    #[tokio::test]
    async fn next_fire_bad_timestamp_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/stupid-alerts-0.0.1/_search");
                then.status(200).json_body(json!({
                    "hits": {"hits": [{"_source": {"next_query": "tomorrow"}}]}
                }));
            })
            .await;

        let err = client_for(&server).next_fire("r").await.unwrap_err();
        assert!(matches!(err, StateError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn set_next_fire_posts_state_document() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path_contains("-status-0.0.1-")
                    .path_contains("/_doc")
                    .body_contains("\"rule_name\":\"nightly-errors\"")
                    .body_contains("\"next_query\":\"2026-03-01T12:30:00Z\"")
                    .body_contains("\"hits_count\":4");
                then.status(201).json_body(json!({"result": "created"}));
            })
            .await;

        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        client_for(&server)
            .set_next_fire("Nightly Errors", at, 4)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn set_next_fire_requires_created() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path_contains("/_doc");
                then.status(200).json_body(json!({"result": "updated"}));
            })
            .await;

        let err = client_for(&server)
            .set_next_fire("r", Utc::now(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::Status { status: 200, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn ensure_state_template_checks_acknowledged() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/_index_template/stupid-alerts-0.0.1");
                then.status(200).json_body(json!({"acknowledged": true}));
            })
            .await;

        client_for(&server).ensure_state_template().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ensure_state_template_rejects_unacknowledged() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/_index_template/stupid-alerts-0.0.1");
                then.status(200).json_body(json!({"acknowledged": false}));
            })
            .await;

        let err = client_for(&server).ensure_state_template().await.unwrap_err();
        assert!(matches!(err, StateError::Decode(_)), "got {err:?}");
    }
}
