//! One cron-driven task per rule.
//!
//! A job waits for its next fire time, queries, extracts records, checks the
//! rule's conditions and enqueues an [`Alert`] for the dispatcher. After each
//! cycle it computes the next fire time and persists it, unless the cycle was
//! skipped for lack of leadership. Cycles of one job never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde_json::Value;
use stupid_notify::{Alert, Channel};
use stupid_rules::scheduler::{next_fire_after, parse_schedule};
use stupid_rules::{evaluate, extract_with_body_field, Rule};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::leadership::Leadership;
use crate::search::SearchEngine;
use crate::state::ScheduleStateStore;

// ── Errors ────────────────────────────────────────────────────

/// A job that cannot be built. Only the affected rule is skipped.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("rule '{rule}': invalid schedule '{schedule}': {source}")]
    Schedule {
        rule: String,
        schedule: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("rule '{rule}' has no output channels")]
    NoChannels { rule: String },

    #[error("rule '{rule}': cannot build {kind} channel: {source}")]
    Channel {
        rule: String,
        kind: &'static str,
        #[source]
        source: stupid_notify::NotifyError,
    },
}

// ── Lifecycle ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    AwaitingInitialSchedule,
    Waiting(DateTime<Utc>),
    Querying,
    Stopped,
}

/// What a single cycle did. `hits` is the raw document count of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Dispatched { records: usize, hits: u64 },
    NoRecords { hits: u64 },
    ConditionsNotMet { hits: u64 },
    ExtractFailed { hits: u64 },
    QueryFailed,
    NotLeader,
    Cancelled,
}

impl CycleOutcome {
    pub fn hits(&self) -> u64 {
        match *self {
            Self::Dispatched { hits, .. }
            | Self::NoRecords { hits }
            | Self::ConditionsNotMet { hits }
            | Self::ExtractFailed { hits } => hits,
            Self::QueryFailed | Self::NotLeader | Self::Cancelled => 0,
        }
    }
}

/// Cancellation handed to a running job.
///
/// `stop` (reload, leadership loss) is only observed while waiting, so an
/// in-flight query still completes. `shutdown` also aborts the query. The
/// controller derives `stop` from `shutdown`, so shutdown implies stop.
#[derive(Debug, Clone)]
pub struct JobSignals {
    pub shutdown: CancellationToken,
    pub stop: CancellationToken,
}

impl JobSignals {
    pub fn new(shutdown: CancellationToken) -> Self {
        let stop = shutdown.child_token();
        Self { shutdown, stop }
    }
}

// ── RuleJob ───────────────────────────────────────────────────

pub struct RuleJob {
    rule: Rule,
    schedule: Schedule,
    channels: Vec<Arc<dyn Channel>>,
    search: Arc<dyn SearchEngine>,
    state: Arc<dyn ScheduleStateStore>,
    leadership: Arc<dyn Leadership>,
    alerts: mpsc::Sender<Alert>,
    status: watch::Sender<JobState>,
}

impl RuleJob {
    pub fn new(
        rule: Rule,
        channels: Vec<Arc<dyn Channel>>,
        search: Arc<dyn SearchEngine>,
        state: Arc<dyn ScheduleStateStore>,
        leadership: Arc<dyn Leadership>,
        alerts: mpsc::Sender<Alert>,
    ) -> Result<Self, JobError> {
        let schedule = parse_schedule(&rule.schedule).map_err(|source| JobError::Schedule {
            rule: rule.name.clone(),
            schedule: rule.schedule.clone(),
            source,
        })?;
        if channels.is_empty() {
            return Err(JobError::NoChannels { rule: rule.name });
        }

        let (status, _rx) = watch::channel(JobState::AwaitingInitialSchedule);
        Ok(Self {
            rule,
            schedule,
            channels,
            search,
            state,
            leadership,
            alerts,
            status,
        })
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Follow the job through its lifecycle.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.status.subscribe()
    }

    /// Run cycles until stopped, shut down, or the schedule is exhausted.
    pub async fn run(self, signals: JobSignals) {
        let name = self.rule.name.clone();
        self.status.send_replace(JobState::AwaitingInitialSchedule);

        let persisted = tokio::select! {
            biased;
            _ = signals.stop.cancelled() => {
                self.status.send_replace(JobState::Stopped);
                return;
            }
            lookup = self.state.next_fire(&name) => lookup,
        };
        let mut next = match persisted {
            Ok(Some(at)) => at,
            Ok(None) => Utc::now(),
            Err(e) => {
                warn!(rule = %name, error = %e, "next fire lookup failed, running query now");
                Utc::now()
            }
        };
        info!(rule = %name, next_fire = %next, "rule scheduled");

        let mut maintain_state = true;
        loop {
            self.status.send_replace(JobState::Waiting(next));
            let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                biased;
                _ = signals.stop.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            let outcome = self.run_cycle(&signals.shutdown).await;
            debug!(rule = %name, outcome = ?outcome, "cycle finished");
            if outcome == CycleOutcome::Cancelled {
                break;
            }

            next = match next_fire_after(&self.schedule, Utc::now()) {
                Some(at) => at,
                None => {
                    info!(rule = %name, "schedule has no further fire times");
                    break;
                }
            };

            // A demoted instance leaves the shared state to the new leader.
            if maintain_state && outcome != CycleOutcome::NotLeader {
                let persisted = tokio::select! {
                    biased;
                    _ = signals.shutdown.cancelled() => break,
                    r = self.state.set_next_fire(&name, next, outcome.hits()) => r,
                };
                if let Err(e) = persisted {
                    error!(rule = %name, error = %e, "cannot persist next fire time");
                    info!(rule = %name, "continuing without persisting job state");
                    maintain_state = false;
                }
            }
        }

        self.status.send_replace(JobState::Stopped);
        info!(rule = %name, "rule job stopped");
    }

    /// Execute one query cycle. Errors are logged and reported as outcomes.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> CycleOutcome {
        let name = self.rule.name.as_str();
        if !self.leadership.is_leader() {
            debug!(rule = %name, "not leader, skipping query");
            return CycleOutcome::NotLeader;
        }

        self.status.send_replace(JobState::Querying);
        let response = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return CycleOutcome::Cancelled,
            r = self.search.search(&self.rule.index, &self.rule.body) => r,
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                error!(rule = %name, index = %self.rule.index, error = %e, "query failed, skipping cycle");
                return CycleOutcome::QueryFailed;
            }
        };

        let hits = hit_count(&response);
        let records =
            match extract_with_body_field(&response, &self.rule.filters, &self.rule.body_field) {
                Ok(r) => r,
                Err(e) => {
                    error!(rule = %name, error = %e, "cannot process response, skipping cycle");
                    return CycleOutcome::ExtractFailed { hits };
                }
            };

        if !self.rule.conditions.is_empty() && !evaluate(&response, &self.rule.conditions) {
            info!(rule = %name, "conditions not met, no alert");
            return CycleOutcome::ConditionsNotMet { hits };
        }
        if records.is_empty() {
            debug!(rule = %name, hits, "no records extracted");
            return CycleOutcome::NoRecords { hits };
        }

        let alert = Alert::new(name, records, self.channels.clone());
        let record_count = alert.records.len();
        info!(rule = %name, alert_id = %alert.id, records = record_count, "enqueueing alert");

        // Blocks while the queue is full.
        let sent = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return CycleOutcome::Cancelled,
            r = self.alerts.send(alert) => r,
        };
        if let Err(e) = sent {
            warn!(rule = %name, alert_id = %e.0.id, "alert queue closed, alert dropped");
        }

        CycleOutcome::Dispatched {
            records: record_count,
            hits,
        }
    }
}

fn hit_count(response: &Value) -> u64 {
    response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map_or(0, |hits| hits.len() as u64)
}
