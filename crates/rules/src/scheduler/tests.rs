//! Tests for the scheduler module.

use chrono::{TimeZone, Timelike, Utc};

use super::*;

// -- normalize_cron ----------------------------------------------------

#[test]
fn normalize_cron_5_to_6_fields() {
    assert_eq!(normalize_cron("*/15 * * * *"), "0 */15 * * * *");
    assert_eq!(normalize_cron("0 6 * * 1-5"), "0 0 6 * * 1-5");
    assert_eq!(normalize_cron("30 2 1 * *"), "0 30 2 1 * *");
}

#[test]
fn normalize_cron_already_6_fields() {
    assert_eq!(normalize_cron("0 */15 * * * *"), "0 */15 * * * *");
}

#[test]
fn normalize_cron_trims_whitespace() {
    assert_eq!(normalize_cron("  */5 * * * *  "), "0 */5 * * * *");
}

#[test]
fn normalize_cron_passes_macros_through() {
    assert_eq!(normalize_cron("@hourly"), "@hourly");
}

// -- parse_schedule ----------------------------------------------------

#[test]
fn parse_schedule_accepts_both_forms() {
    assert!(parse_schedule("*/5 * * * *").is_ok());
    assert!(parse_schedule("*/10 * * * * *").is_ok());
    assert!(parse_schedule("@daily").is_ok());
}

#[test]
fn parse_schedule_rejects_garbage() {
    assert!(parse_schedule("every five minutes").is_err());
    assert!(parse_schedule("").is_err());
}

// -- next_fire_after ---------------------------------------------------

#[test]
fn next_fire_is_strictly_after() {
    let schedule = parse_schedule("*/15 * * * *").unwrap();
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
    let next = next_fire_after(&schedule, at).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
}

#[test]
fn next_fire_for_every_second() {
    let schedule = parse_schedule("* * * * * *").unwrap();
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 7).unwrap();
    let next = next_fire_after(&schedule, at).unwrap();
    assert_eq!(next.second(), 8);
}
