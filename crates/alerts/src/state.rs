//! Persisted next-fire times.
//!
//! A job asks the store when it should first fire so that restarts do not
//! re-run a query early, and records the next fire time after every cycle.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

/// Failure talking to the state store. Always logged, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("state store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot decode state document: {0}")]
    Decode(String),
}

#[async_trait::async_trait]
pub trait ScheduleStateStore: Send + Sync {
    /// Latest persisted next-fire time of `rule`, if any.
    async fn next_fire(&self, rule: &str) -> Result<Option<DateTime<Utc>>, StateError>;

    /// Record that `rule` fires next at `at`. `hits_count` is the number of
    /// documents the cycle that just ran returned.
    async fn set_next_fire(
        &self,
        rule: &str,
        at: DateTime<Utc>,
        hits_count: u64,
    ) -> Result<(), StateError>;
}

/// Key under which a rule's state is stored: lower-cased, spaces as `-`.
pub fn state_key(rule: &str) -> String {
    rule.to_lowercase().replace(' ', "-")
}

/// Process-local store used when state is not kept in Elasticsearch.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a next-fire time, as if a previous run had persisted it.
    pub fn insert(&self, rule: &str, at: DateTime<Utc>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state_key(rule), at);
    }

    pub fn get(&self, rule: &str) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&state_key(rule))
            .copied()
    }
}

#[async_trait::async_trait]
impl ScheduleStateStore for MemoryStateStore {
    async fn next_fire(&self, rule: &str) -> Result<Option<DateTime<Utc>>, StateError> {
        Ok(self.get(rule))
    }

    async fn set_next_fire(
        &self,
        rule: &str,
        at: DateTime<Utc>,
        _hits_count: u64,
    ) -> Result<(), StateError> {
        self.insert(rule, at);
        Ok(())
    }
}
