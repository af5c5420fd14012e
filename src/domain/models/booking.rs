//! Booking domain entity and its status state machine

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{BookingError, BookingResult};
use crate::shared::datetime;

/// Booking lifecycle status.
///
/// One typed enum is the single source of truth; storage backends round-trip
/// through the snake_case string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
    InProgress,
    Overdue,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::Overdue => "overdue",
            Self::NoShow => "no_show",
        }
    }

    /// Parse the stored string form. Unknown strings are an error at the
    /// call site, never silently mapped to a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            "in_progress" => Some(Self::InProgress),
            "overdue" => Some(Self::Overdue),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    /// Whether `self -> target` is a legal transition.
    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, target),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, InProgress)
                | (Approved, Cancelled)
                | (Approved, NoShow)
                | (Approved, Overdue)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Overdue)
                | (Overdue, Completed)
                | (Overdue, NoShow)
                | (Overdue, Cancelled)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Cancelled | Self::Completed | Self::NoShow
        )
    }

    /// Counts toward quota limits.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::InProgress)
    }

    /// Still occupies its time slot for conflict purposes. Overdue bookings
    /// hold their slot until resolved, even though they no longer count
    /// toward quotas.
    pub fn occupies_slot(&self) -> bool {
        self.is_active() || *self == Self::Overdue
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-boxed claim on a lab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub lab_id: String,
    pub user_id: String,
    /// Denormalized for display; labs are never hard-deleted
    pub lab_name: String,
    pub user_name: String,
    pub user_email: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub purpose: String,
    pub participants: u32,
    /// Subset of the lab's equipment list
    pub required_resources: Vec<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub total_cost: f64,
    pub refund_amount: Option<f64>,
    pub reminder_sent: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub actual_usage_minutes: Option<i64>,
    /// Optimistic concurrency stamp. The storage backend bumps it on every
    /// update and rejects writes carrying a stale value.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        lab_id: impl Into<String>,
        user_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        purpose: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            lab_id: lab_id.into(),
            user_id: user_id.into(),
            lab_name: String::new(),
            user_name: String::new(),
            user_email: String::new(),
            date,
            start_time,
            end_time,
            status: BookingStatus::Pending,
            purpose: purpose.into(),
            participants: 1,
            required_resources: Vec::new(),
            reviewed_by: None,
            reviewed_at: None,
            admin_notes: None,
            cancellation_reason: None,
            total_cost: 0.0,
            refund_amount: None,
            reminder_sent: false,
            checked_in_at: None,
            checked_out_at: None,
            actual_usage_minutes: None,
            version: 0,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        datetime::duration_minutes(self.start_time, self.end_time)
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes() as f64 / 60.0
    }

    /// Display form, e.g. "09:00 - 10:00".
    pub fn time_slot(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn occupies_slot(&self) -> bool {
        self.status.occupies_slot()
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        datetime::to_instant(self.date, self.start_time)
    }

    pub fn end_instant(&self) -> DateTime<Utc> {
        datetime::to_instant(self.date, self.end_time)
    }

    /// Cancellable while active and the start time has not passed.
    pub fn can_be_cancelled(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now < self.start_instant()
    }

    /// Modifiable only while still pending review and not started.
    pub fn can_be_modified(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && now < self.start_instant()
    }

    /// An approved booking needs a reminder once its start falls within the
    /// lead window and none has been sent yet.
    pub fn needs_reminder(&self, now: DateTime<Utc>, lead_hours: i64) -> bool {
        if self.reminder_sent || self.status != BookingStatus::Approved {
            return false;
        }
        let hours = datetime::hours_until(self.date, self.start_time, now);
        hours >= 0 && hours <= lead_hours
    }

    fn transition(&mut self, target: BookingStatus, now: DateTime<Utc>) -> BookingResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(BookingError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(
        &mut self,
        admin_id: impl Into<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> BookingResult<()> {
        self.transition(BookingStatus::Approved, now)?;
        self.reviewed_by = Some(admin_id.into());
        self.reviewed_at = Some(now);
        self.admin_notes = notes;
        Ok(())
    }

    pub fn reject(
        &mut self,
        admin_id: impl Into<String>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> BookingResult<()> {
        self.transition(BookingStatus::Rejected, now)?;
        self.reviewed_by = Some(admin_id.into());
        self.reviewed_at = Some(now);
        self.admin_notes = Some(reason.into());
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> BookingResult<()> {
        if !self.can_be_cancelled(now) {
            return Err(BookingError::InvalidTransition {
                from: self.status,
                to: BookingStatus::Cancelled,
            });
        }
        self.transition(BookingStatus::Cancelled, now)?;
        self.cancellation_reason = Some(reason.into());
        Ok(())
    }

    pub fn check_in(&mut self, now: DateTime<Utc>) -> BookingResult<()> {
        self.transition(BookingStatus::InProgress, now)?;
        self.checked_in_at = Some(now);
        Ok(())
    }

    /// Check-out completes the booking (also from Overdue, for late
    /// check-outs) and records the actual usage duration.
    pub fn check_out(&mut self, now: DateTime<Utc>) -> BookingResult<()> {
        self.transition(BookingStatus::Completed, now)?;
        self.checked_out_at = Some(now);
        if let Some(checked_in) = self.checked_in_at {
            self.actual_usage_minutes = Some((now - checked_in).num_minutes());
        }
        Ok(())
    }

    pub fn mark_no_show(&mut self, now: DateTime<Utc>) -> BookingResult<()> {
        self.transition(BookingStatus::NoShow, now)
    }

    pub fn mark_overdue(&mut self, now: DateTime<Utc>) -> BookingResult<()> {
        self.transition(BookingStatus::Overdue, now)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_booking() -> Booking {
        let created = datetime::to_instant(d(2026, 3, 10), t(12, 0));
        Booking::new(
            "b-1",
            "lab-1",
            "u-1",
            d(2026, 3, 15),
            t(9, 0),
            t(10, 0),
            "Circuit prototyping",
            created,
        )
    }

    #[test]
    fn new_booking_is_pending_and_active() {
        let b = sample_booking();
        assert_eq!(b.status, BookingStatus::Pending);
        assert!(b.is_active());
        assert!(b.occupies_slot());
        assert_eq!(b.duration_minutes(), 60);
        assert_eq!(b.time_slot(), "09:00 - 10:00");
    }

    #[test]
    fn full_happy_path() {
        let mut b = sample_booking();
        let now = b.created_at;

        b.approve("admin-1", Some("ok".into()), now).unwrap();
        assert_eq!(b.status, BookingStatus::Approved);
        assert_eq!(b.reviewed_by.as_deref(), Some("admin-1"));

        let start = b.start_instant();
        b.check_in(start).unwrap();
        assert_eq!(b.status, BookingStatus::InProgress);

        let end = start + Duration::minutes(55);
        b.check_out(end).unwrap();
        assert_eq!(b.status, BookingStatus::Completed);
        assert_eq!(b.actual_usage_minutes, Some(55));
    }

    #[test]
    fn approve_is_pending_only() {
        let mut b = sample_booking();
        let now = b.created_at;
        b.approve("admin-1", None, now).unwrap();

        // Second approve must fail and not mutate
        let reviewed_at = b.reviewed_at;
        let err = b.approve("admin-2", None, now).unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::Approved,
                to: BookingStatus::Approved,
            }
        ));
        assert_eq!(b.reviewed_by.as_deref(), Some("admin-1"));
        assert_eq!(b.reviewed_at, reviewed_at);
    }

    #[test]
    fn reject_is_pending_only() {
        let mut b = sample_booking();
        let now = b.created_at;
        b.cancel("changed plans", now).unwrap();

        let err = b.reject("admin-1", "late", now).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
        assert_eq!(b.status, BookingStatus::Cancelled);
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use BookingStatus::*;
        for terminal in [Rejected, Cancelled, Completed, NoShow] {
            assert!(terminal.is_terminal());
            for target in [
                Pending, Approved, Rejected, Cancelled, Completed, InProgress, Overdue, NoShow,
            ] {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} must be illegal"
                );
            }
        }
    }

    #[test]
    fn cancel_blocked_after_start_time() {
        let mut b = sample_booking();
        let after_start = b.start_instant() + Duration::minutes(1);
        assert!(!b.can_be_cancelled(after_start));
        assert!(b.cancel("too late", after_start).is_err());
        assert_eq!(b.status, BookingStatus::Pending);
    }

    #[test]
    fn check_in_requires_approved() {
        let mut b = sample_booking();
        let err = b.check_in(b.created_at).unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[test]
    fn overdue_still_occupies_slot_but_not_quota() {
        let mut b = sample_booking();
        let now = b.created_at;
        b.approve("admin-1", None, now).unwrap();
        b.check_in(b.start_instant()).unwrap();
        b.mark_overdue(b.end_instant() + Duration::minutes(10)).unwrap();

        assert_eq!(b.status, BookingStatus::Overdue);
        assert!(b.occupies_slot());
        assert!(!b.is_active());
    }

    #[test]
    fn late_checkout_from_overdue_completes() {
        let mut b = sample_booking();
        let now = b.created_at;
        b.approve("admin-1", None, now).unwrap();
        b.check_in(b.start_instant()).unwrap();
        let late = b.end_instant() + Duration::minutes(30);
        b.mark_overdue(late).unwrap();
        b.check_out(late + Duration::minutes(5)).unwrap();

        assert_eq!(b.status, BookingStatus::Completed);
        assert_eq!(b.actual_usage_minutes, Some(95));
    }

    #[test]
    fn no_show_from_approved() {
        let mut b = sample_booking();
        b.approve("admin-1", None, b.created_at).unwrap();
        b.mark_no_show(b.start_instant() + Duration::hours(1)).unwrap();
        assert_eq!(b.status, BookingStatus::NoShow);
        assert!(!b.occupies_slot());
    }

    #[test]
    fn only_pending_unstarted_bookings_are_modifiable() {
        let mut b = sample_booking();
        let before = b.created_at;
        assert!(b.can_be_modified(before));

        let after_start = b.start_instant() + Duration::minutes(1);
        assert!(!b.can_be_modified(after_start));

        b.approve("admin-1", None, before).unwrap();
        assert!(!b.can_be_modified(before));
    }

    #[test]
    fn reminder_window() {
        let mut b = sample_booking();
        b.approve("admin-1", None, b.created_at).unwrap();

        let long_before = b.start_instant() - Duration::hours(48);
        let within = b.start_instant() - Duration::hours(12);
        let after = b.start_instant() + Duration::hours(1);

        assert!(!b.needs_reminder(long_before, 24));
        assert!(b.needs_reminder(within, 24));
        assert!(!b.needs_reminder(after, 24));

        b.reminder_sent = true;
        assert!(!b.needs_reminder(within, 24));
    }

    #[test]
    fn status_string_roundtrip() {
        use BookingStatus::*;
        for status in [
            Pending, Approved, Rejected, Cancelled, Completed, InProgress, Overdue, NoShow,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("unknown"), None);
    }
}
