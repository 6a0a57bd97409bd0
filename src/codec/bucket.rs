// src/codec/bucket.rs
//
// Day bucket and minute-of-day offset derivation. All instants are UTC; the
// caller is responsible for timezone normalization.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Largest valid minute-of-day offset (23:59).
pub const MAX_OFFSET: u16 = 1439;

/// Truncate an instant to midnight of its calendar day.
pub fn day_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Whole minutes elapsed since midnight. Seconds and sub-seconds are
/// truncated, so 23:59:30 is offset 1439.
pub fn minute_offset(ts: DateTime<Utc>) -> u16 {
    let seconds = (ts - day_bucket(ts)).num_seconds();
    (seconds / 60) as u16
}

/// Day bucket and offset in one call.
pub fn bucket_key(ts: DateTime<Utc>) -> (DateTime<Utc>, u16) {
    (day_bucket(ts), minute_offset(ts))
}

/// Absolute instant of an offset within a day bucket.
pub fn offset_instant(day: DateTime<Utc>, offset: u16) -> DateTime<Utc> {
    day + Duration::minutes(i64::from(offset))
}

pub fn is_day_bucket(ts: DateTime<Utc>) -> bool {
    day_bucket(ts) == ts
}
