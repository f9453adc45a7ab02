//! Scheduled search alerting.
//!
//! This crate wires the rule engine and the delivery engine together:
//! - `SearchEngine` trait with an Elasticsearch implementation
//! - `ScheduleStateStore` for persisted next-fire times
//! - `Leadership` capability deciding whether this instance runs jobs
//! - `RuleJob`, one cron-driven task per rule
//! - `Controller` owning the jobs, the alert queue and the dispatcher

pub mod controller;
pub mod factory;
pub mod job;
pub mod leadership;
pub mod search;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Controller, ControllerSettings};
pub use factory::{JobContext, JobFactory};
pub use job::{CycleOutcome, JobError, JobSignals, JobState, RuleJob};
pub use leadership::{AlwaysLeader, LeaderFlag, Leadership, LockFileLeadership};
pub use search::{ElasticsearchClient, QueryError, SearchEngine};
pub use state::{state_key, MemoryStateStore, ScheduleStateStore, StateError};
