//! Cron normalization, parsing and next-fire computation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Rule files use standard 5-field cron: `min hour day-of-month month day-of-week`.
/// Six- and seven-field expressions and `@hourly`-style macros pass through.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    let field_count = trimmed.split_whitespace().count();
    if field_count == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse an expression (5-field or native) into a [`Schedule`].
pub fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalize_cron(expr))
}

/// First tick strictly after `after`, or `None` when the schedule never
/// fires again (e.g. a fixed year in the past).
pub fn next_fire_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}
