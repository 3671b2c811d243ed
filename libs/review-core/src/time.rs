//! Clock abstraction and human-readable time formatting for diagnostics.

use crate::types::Timestamp;
use chrono::{Local, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;

/// Source of "now" for due computation and completion stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in epoch seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp()
    }
}

/// Manually advanced clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Format a timestamp in local time, e.g. `2024-03-01 08:15:00`.
pub fn format_timestamp(t: Timestamp) -> String {
    match Local.timestamp_opt(t, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => t.to_string(),
    }
}

/// Format a duration as `HH:MM`, or `MM/DD-HH:MM` once it spans a day.
///
/// Months are 30 days. Negative durations render as `00:00`.
pub fn format_duration(seconds: i64) -> String {
    let mut rest = seconds.max(0);
    let months = rest / MONTH;
    rest %= MONTH;
    let days = rest / DAY;
    rest %= DAY;
    let hours = rest / HOUR;
    rest %= HOUR;
    let minutes = rest / MINUTE;

    if months > 0 || days > 0 {
        format!("{months:02}/{days:02}-{hours:02}:{minutes:02}")
    } else {
        format!("{hours:02}:{minutes:02}")
    }
}

/// First review as a date, then the gaps between consecutive reviews.
pub fn format_time_list(times: &[Timestamp]) -> String {
    let Some(first) = times.first() else {
        return String::new();
    };

    let mut out = format_timestamp(*first);
    for pair in times.windows(2) {
        out.push_str(", ");
        out.push_str(&format_duration(pair[1] - pair[0]));
    }
    out
}
