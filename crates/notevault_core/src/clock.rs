//! Wall-clock helpers for store-assigned timestamps.
//!
//! # Invariants
//! - Timestamps are epoch milliseconds.
//! - `next_updated_at` always moves a record's `updated_at` strictly
//!   forward and never below its `created_at`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in epoch milliseconds. A clock before 1970 reads as `0`.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// `updated_at` for a mutation observed at `now`.
///
/// Two mutations within the same millisecond still get distinct, ordered
/// stamps.
pub fn next_updated_at(now: i64, previous_updated_at: i64, created_at: i64) -> i64 {
    now.max(previous_updated_at.saturating_add(1)).max(created_at)
}
