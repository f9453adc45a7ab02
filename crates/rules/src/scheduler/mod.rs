//! Cron helpers for per-rule schedules.
//!
//! Rule files use standard 5-field cron; the `cron` crate wants a leading
//! seconds field. These helpers normalize expressions and compute the next
//! fire time that a rule job waits for.

pub(crate) mod cron;

#[cfg(test)]
mod tests;

pub use self::cron::{next_fire_after, normalize_cron, parse_schedule};
