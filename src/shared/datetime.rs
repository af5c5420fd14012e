//! Time and interval utilities
//!
//! Pure functions over calendar dates (`YYYY-MM-DD`) and wall-clock times
//! (`HH:MM`, 24-hour). No I/O, no access to the real clock: anything that
//! needs "now" takes it as a parameter.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Malformed date or time input. Never silently defaulted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {what}: {value:?} (expected {expected})")]
pub struct FormatError {
    pub what: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Parse a calendar date in `YYYY-MM-DD` format.
pub fn parse_date(s: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| FormatError {
        what: "date",
        value: s.to_string(),
        expected: "YYYY-MM-DD",
    })
}

/// Parse a wall-clock time in `HH:MM` 24-hour format.
pub fn parse_time(s: &str) -> Result<NaiveTime, FormatError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(|_| FormatError {
        what: "time",
        value: s.to_string(),
        expected: "HH:MM",
    })
}

/// Minutes from `start` to `end`. May be zero or negative; the caller decides
/// what to do with a non-positive duration, this function never clamps.
pub fn duration_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    (end - start).num_minutes()
}

/// Half-open interval overlap test. Touching intervals (one ends exactly when
/// the other starts) do NOT overlap, so back-to-back bookings are legal.
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Inclusive containment test: `lo <= time <= hi`.
pub fn within_range(time: NaiveTime, lo: NaiveTime, hi: NaiveTime) -> bool {
    lo <= time && time <= hi
}

/// Combine a date and time into a UTC instant.
pub fn to_instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Whether the given date+time lies strictly before `now`.
pub fn is_past(date: NaiveDate, time: NaiveTime, now: DateTime<Utc>) -> bool {
    to_instant(date, time) < now
}

/// Whole hours from `now` until the given date+time. Negative when already
/// passed.
pub fn hours_until(date: NaiveDate, time: NaiveTime, now: DateTime<Utc>) -> i64 {
    (to_instant(date, time) - now).num_hours()
}

/// First and last day of the ISO week (Monday through Sunday) containing
/// `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days_from_monday = date.weekday().num_days_from_monday() as i64;
    let start = date - Duration::days(days_from_monday);
    (start, start + Duration::days(6))
}

/// Whether `date` falls no later than `advance_days` days after `today`.
pub fn within_advance_limit(date: NaiveDate, today: NaiveDate, advance_days: u32) -> bool {
    date <= today + Duration::days(advance_days as i64)
}

/// Human-readable duration, e.g. "1h 30m".
pub fn format_duration(minutes: i64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// A candidate slot in an availability listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub available: bool,
}

impl TimeSlot {
    pub fn duration_minutes(&self) -> i64 {
        duration_minutes(self.start, self.end)
    }
}

/// Generate all slots of `duration` minutes that fit inside the operating
/// window, stepping by `interval` minutes. All slots start out available.
pub fn available_slots(
    open: NaiveTime,
    close: NaiveTime,
    duration: u32,
    interval: u32,
) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    if duration == 0 || interval == 0 {
        return slots;
    }

    let mut start = open;
    loop {
        let end = start + Duration::minutes(duration as i64);
        // NaiveTime arithmetic wraps at midnight; detect it via ordering
        if end > close || end <= start {
            break;
        }
        slots.push(TimeSlot {
            start,
            end,
            available: true,
        });
        let next = start + Duration::minutes(interval as i64);
        if next <= start {
            break;
        }
        start = next;
    }
    slots
}

// ── Tests ──────────────────────────────────────────────────────
