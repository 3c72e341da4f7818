//! Duration rules for closing a shift.

use chrono::{DateTime, Utc};

use super::timestamp::parse_timestamp;
use crate::error::Result;
use crate::pocketbase::ShiftRecord;

/// Longest duration ever written to a shift record.
pub const MAX_DURATION_MINUTES: i64 = 360;

/// Whole minutes from `start` to `end`, rounded down, never less than 1.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds().max(0);
    (seconds / 60).max(1)
}

/// Elapsed time of a shift and the value that gets recorded for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftDuration {
    pub elapsed_minutes: i64,
    pub recorded_minutes: i64,
}

impl ShiftDuration {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let elapsed_minutes = minutes_between(start, end);
        Self {
            elapsed_minutes,
            recorded_minutes: elapsed_minutes.min(MAX_DURATION_MINUTES),
        }
    }

    pub fn is_capped(&self) -> bool {
        self.recorded_minutes < self.elapsed_minutes
    }
}

/// Everything needed to complete an active shift at `end`.
#[derive(Debug, Clone)]
pub struct ShiftClosure {
    pub shift_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: ShiftDuration,
}

impl ShiftClosure {
    /// A shift without a start time is treated as starting at `now`.
    pub fn for_shift(active: &ShiftRecord, now: DateTime<Utc>) -> Result<Self> {
        let start = started_at(active, now)?;
        Ok(Self {
            shift_id: active.id.clone(),
            start,
            end: now,
            duration: ShiftDuration::between(start, now),
        })
    }
}

/// Start time of a shift, or `fallback` when the backend left it unset.
pub fn started_at(shift: &ShiftRecord, fallback: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match shift.start_time() {
        Some(raw) => parse_timestamp(raw),
        None => Ok(fallback),
    }
}

pub fn format_minutes(minutes: i64) -> String {
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}
