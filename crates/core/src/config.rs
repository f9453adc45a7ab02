use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StupidError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub elasticsearch: ElasticsearchConfig,
    pub alerts: AlertsConfig,
    pub leadership: LeadershipConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STUPID_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STUPID_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            elasticsearch: ElasticsearchConfig::from_env_profiled(p),
            alerts: AlertsConfig::from_env_profiled(p),
            leadership: LeadershipConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings the worker cannot start with.
    pub fn validate(&self) -> Result<(), StupidError> {
        if self.elasticsearch.url.trim().is_empty() {
            return Err(StupidError::Config(
                "ELASTICSEARCH_URL must not be empty".to_string(),
            ));
        }
        if self.alerts.queue_capacity == 0 {
            return Err(StupidError::Config(
                "ALERTS_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.alerts.retry_budget == 0 {
            return Err(StupidError::Config(
                "ALERTS_RETRY_BUDGET must be at least 1".to_string(),
            ));
        }
        if self.leadership.distributed && self.leadership.lock_file.is_none() {
            return Err(StupidError::Config(
                "ALERTS_LEADER_LOCK_FILE is required when ALERTS_DISTRIBUTED is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  elasticsearch: url={}, state_alias={}, maintain_state={}",
            self.elasticsearch.redacted_url(),
            self.elasticsearch.state_alias,
            self.elasticsearch.maintain_state
        );
        tracing::info!(
            "  alerts:        rules_dir={}, queue={}, retry_budget={}",
            self.alerts.rules_dir.display(),
            self.alerts.queue_capacity,
            self.alerts.retry_budget
        );
        tracing::info!(
            "  leadership:    distributed={}, lock_file={}",
            self.leadership.distributed,
            self.leadership
                .lock_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
    }
}

// ── Elasticsearch ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    pub url: String,
    /// Alias over the dated state indices that hold next-fire documents.
    pub state_alias: String,
    pub timeout_secs: u64,
    /// Persist next-fire times in Elasticsearch; otherwise keep them in memory.
    pub maintain_state: bool,
}

impl ElasticsearchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "ELASTICSEARCH_URL", "http://localhost:9200")
                .trim_end_matches('/')
                .to_string(),
            state_alias: profiled_env_or(p, "ELASTICSEARCH_STATE_ALIAS", "stupid-alerts"),
            timeout_secs: profiled_env_u64(p, "ELASTICSEARCH_TIMEOUT_SECS", 30),
            maintain_state: profiled_env_bool(p, "ALERTS_MAINTAIN_STATE", true),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL with any `user:password@` userinfo stripped.
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***@{}", &self.url[..scheme_end], &self.url[at + 1..])
            }
            _ => self.url.clone(),
        }
    }
}

// ── Alert pipeline ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    pub rules_dir: PathBuf,
    /// Capacity of the queue between rule jobs and the dispatcher.
    pub queue_capacity: usize,
    /// Delivery attempts per alert and channel.
    pub retry_budget: u32,
    pub shutdown_timeout_secs: u64,
    /// Reload rules when files in `rules_dir` change.
    pub watch_rules: bool,
}

impl AlertsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "ALERTS_RULES_DIR", "data/alerts")),
            queue_capacity: profiled_env_u32(p, "ALERTS_QUEUE_CAPACITY", 4) as usize,
            retry_budget: profiled_env_u32(p, "ALERTS_RETRY_BUDGET", 3),
            shutdown_timeout_secs: profiled_env_u64(p, "ALERTS_SHUTDOWN_TIMEOUT_SECS", 10),
            watch_rules: profiled_env_bool(p, "ALERTS_WATCH_RULES", true),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

// ── Leadership ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadershipConfig {
    /// Several instances share the rule set; only the lock holder runs jobs.
    pub distributed: bool,
    /// File whose presence means this instance holds the external lock.
    pub lock_file: Option<PathBuf>,
    pub poll_interval_secs: u64,
}

impl LeadershipConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            distributed: profiled_env_bool(p, "ALERTS_DISTRIBUTED", false),
            lock_file: profiled_env_opt(p, "ALERTS_LEADER_LOCK_FILE").map(PathBuf::from),
            poll_interval_secs: profiled_env_u64(p, "ALERTS_LEADER_POLL_SECS", 5),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
