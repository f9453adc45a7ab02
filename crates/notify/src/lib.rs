//! Alert delivery engine.
//!
//! This crate provides:
//! - `Channel` trait for pluggable notification channels
//! - File, webhook, and email channel implementations
//! - Minijinja template rendering for webhook bodies and emails
//! - `Inventory` retry-budget bookkeeping for in-flight deliveries
//! - `Dispatcher` that fans each alert out to its channels with bounded retry

pub mod alert;
pub mod dispatcher;
pub mod email;
pub mod file;
pub mod inventory;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use alert::Alert;
pub use dispatcher::{DeliveryOutcome, Dispatcher};
pub use inventory::Inventory;
pub use traits::{AlertPayload, Channel, NotifyError};
