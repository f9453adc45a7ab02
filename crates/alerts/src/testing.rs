//! Mocks shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use stupid_core::Record;
use stupid_notify::{Channel, NotifyError};
use stupid_rules::schema::OutputConfig;
use stupid_rules::Rule;

use crate::search::{QueryError, SearchEngine};
use crate::state::{ScheduleStateStore, StateError};

/// Every-second rule over `index = name` with no filters.
pub fn rule(name: &str) -> Rule {
    Rule {
        name: name.to_string(),
        index: name.to_string(),
        body: json!({"query": {"match_all": {}}}),
        schedule: "* * * * * *".to_string(),
        body_field: "hits.hits._source".to_string(),
        filters: Vec::new(),
        conditions: Vec::new(),
        outputs: vec![OutputConfig::File {
            file: "/dev/null".to_string(),
        }],
    }
}

/// Replays scripted responses (`Err(status)` for failures), then answers
/// with an empty result set.
pub struct ScriptedSearch {
    script: Mutex<VecDeque<Result<Value, u16>>>,
    calls: AtomicUsize,
    per_index: Mutex<HashMap<String, usize>>,
    hang: bool,
}

impl ScriptedSearch {
    pub fn new(script: Vec<Result<Value, u16>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            per_index: Mutex::new(HashMap::new()),
            hang: false,
        })
    }

    /// Never answers.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            per_index: Mutex::new(HashMap::new()),
            hang: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, index: &str) -> usize {
        self.per_index
            .lock()
            .unwrap()
            .get(index)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl SearchEngine for ScriptedSearch {
    async fn search(&self, index: &str, _body: &Value) -> Result<Value, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_index
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default() += 1;
        if self.hang {
            std::future::pending::<()>().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(v)) => Ok(v),
            Some(Err(status)) => Err(QueryError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(json!({"hits": {"hits": []}})),
        }
    }
}

/// Channel that succeeds and counts deliveries.
#[derive(Default)]
pub struct CountingChannel {
    delivered: AtomicUsize,
}

impl CountingChannel {
    pub fn arc() -> Arc<dyn Channel> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Channel for CountingChannel {
    async fn deliver(&self, _rule_name: &str, _records: &[Record]) -> Result<(), NotifyError> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "counting"
    }
}

/// State store whose every request fails. Counts both kinds of request.
#[derive(Default)]
pub struct FailingStateStore {
    lookups: AtomicUsize,
    writes: AtomicUsize,
}

impl FailingStateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ScheduleStateStore for FailingStateStore {
    async fn next_fire(&self, _rule: &str) -> Result<Option<DateTime<Utc>>, StateError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(StateError::Status {
            status: 503,
            body: "state store unavailable".to_string(),
        })
    }

    async fn set_next_fire(
        &self,
        _rule: &str,
        _at: DateTime<Utc>,
        _hits_count: u64,
    ) -> Result<(), StateError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StateError::Status {
            status: 503,
            body: "state store unavailable".to_string(),
        })
    }
}
