//! Eligibility validation
//!
//! Fourteen sequential checks, short-circuiting on the first failure so the
//! caller always sees a deterministic reason code. The account, resource and
//! interval checks are local against already-fetched records; the quota and
//! conflict checks query storage and therefore run last, conflict detection
//! at the very end.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::application::conflict::ConflictDetector;
use crate::config::BookingConfig;
use crate::domain::{Booking, BookingError, BookingResult, Lab, RejectionReason, User};
use crate::infrastructure::Storage;
use crate::shared::datetime;
use crate::shared::retry::retry_with_backoff;
use crate::shared::Clock;

/// Outcome of a validation run. Rejections are data, not errors; only
/// storage failures surface as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub accepted: bool,
    pub reason: Option<RejectionReason>,
    pub details: Option<String>,
}

impl Decision {
    fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
            details: None,
        }
    }

    fn reject(reason: RejectionReason, details: Option<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            details,
        }
    }

    /// Convert a rejection into the error the workflow service propagates.
    pub fn into_result(self) -> BookingResult<()> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(BookingError::Rejected {
                reason,
                details: self.details,
            }),
        }
    }
}

/// A candidate reservation to validate, before any record is written.
#[derive(Debug, Clone)]
pub struct BookingRequest<'a> {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub participants: u32,
    pub required_resources: &'a [String],
}

pub struct EligibilityValidator {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
}

impl EligibilityValidator {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, config: BookingConfig) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    /// Run every check in order and return the first failure, if any.
    pub async fn validate(
        &self,
        user: &User,
        lab: &Lab,
        request: &BookingRequest<'_>,
    ) -> BookingResult<Decision> {
        if let Some(decision) = self.check_local(user, lab, request) {
            debug!(
                user_id = %user.id,
                lab_id = %lab.id,
                reason = ?decision.reason,
                "booking request rejected locally"
            );
            return Ok(decision);
        }

        if let Some(decision) = self.check_booking_limit(user).await? {
            return Ok(decision);
        }
        if let Some(decision) = self.check_weekly_hours(user, request).await? {
            return Ok(decision);
        }
        if let Some(decision) = self.check_slot_conflict(lab, request).await? {
            return Ok(decision);
        }

        Ok(Decision::accept())
    }

    /// Checks against the already-fetched user and lab records. No I/O.
    fn check_local(
        &self,
        user: &User,
        lab: &Lab,
        request: &BookingRequest<'_>,
    ) -> Option<Decision> {
        if !user.is_active {
            return Some(Decision::reject(RejectionReason::AccountInactive, None));
        }

        if self.config.require_verification && !user.is_verified {
            return Some(Decision::reject(
                RejectionReason::VerificationRequired,
                None,
            ));
        }

        if user.is_lab_restricted(&lab.id) {
            return Some(Decision::reject(
                RejectionReason::ResourceRestricted,
                Some(format!("access to {} is restricted for this account", lab.name)),
            ));
        }

        if !lab.is_bookable() {
            let details = if lab.maintenance_mode {
                lab.maintenance_message
                    .clone()
                    .or_else(|| Some("under maintenance".to_string()))
            } else {
                Some("lab is not active".to_string())
            };
            return Some(Decision::reject(
                RejectionReason::ResourceUnavailable,
                details,
            ));
        }

        if !lab.allows_role(user.role) {
            return Some(Decision::reject(
                RejectionReason::RoleNotAllowed,
                Some(format!("role {} may not book this lab", user.role)),
            ));
        }

        if request.participants == 0 || request.participants > lab.capacity {
            return Some(Decision::reject(
                RejectionReason::CapacityExceeded,
                Some(format!(
                    "{} participants, capacity {}",
                    request.participants, lab.capacity
                )),
            ));
        }

        let missing = lab.missing_equipment(request.required_resources);
        if !missing.is_empty() {
            return Some(Decision::reject(
                RejectionReason::EquipmentUnavailable,
                Some(format!("not available in this lab: {}", missing.join(", "))),
            ));
        }

        if !datetime::within_range(request.start, lab.open_time, lab.close_time)
            || !datetime::within_range(request.end, lab.open_time, lab.close_time)
        {
            return Some(Decision::reject(
                RejectionReason::OutsideOperatingHours,
                Some(format!(
                    "operating hours are {} - {}",
                    lab.open_time.format("%H:%M"),
                    lab.close_time.format("%H:%M")
                )),
            ));
        }

        let minutes = datetime::duration_minutes(request.start, request.end);
        if minutes < lab.min_booking_minutes as i64 || minutes > lab.max_booking_minutes() as i64 {
            return Some(Decision::reject(
                RejectionReason::DurationOutOfBounds,
                Some(format!(
                    "duration {}, allowed {} to {}",
                    datetime::format_duration(minutes.max(0)),
                    datetime::format_duration(lab.min_booking_minutes as i64),
                    datetime::format_duration(lab.max_booking_minutes() as i64)
                )),
            ));
        }

        let now = self.clock.now();
        if datetime::is_past(request.date, request.start, now) {
            return Some(Decision::reject(RejectionReason::DateInPast, None));
        }

        if !datetime::within_advance_limit(request.date, self.clock.today(), lab.advance_booking_days)
        {
            return Some(Decision::reject(
                RejectionReason::TooFarInAdvance,
                Some(format!(
                    "bookings open {} days ahead",
                    lab.advance_booking_days
                )),
            ));
        }

        None
    }

    async fn check_booking_limit(&self, user: &User) -> BookingResult<Option<Decision>> {
        let active = self
            .read(
                || self.storage.find_active_bookings_for_user(&user.id),
                "find_active_bookings_for_user",
            )
            .await?;

        if active.len() as u32 >= user.max_simultaneous_bookings {
            return Ok(Some(Decision::reject(
                RejectionReason::BookingLimitReached,
                Some(format!(
                    "{} of {} active bookings",
                    active.len(),
                    user.max_simultaneous_bookings
                )),
            )));
        }
        Ok(None)
    }

    async fn check_weekly_hours(
        &self,
        user: &User,
        request: &BookingRequest<'_>,
    ) -> BookingResult<Option<Decision>> {
        let (week_start, week_end) = datetime::week_bounds(request.date);
        let weekly = self
            .read(
                || {
                    self.storage
                        .find_user_bookings_in_week(&user.id, week_start, week_end)
                },
                "find_user_bookings_in_week",
            )
            .await?;

        let booked_minutes: i64 = weekly.iter().map(|b| b.duration_minutes()).sum();
        let candidate_minutes = datetime::duration_minutes(request.start, request.end);
        let limit_minutes = user.max_weekly_hours as i64 * 60;

        if booked_minutes + candidate_minutes > limit_minutes {
            return Ok(Some(Decision::reject(
                RejectionReason::WeeklyHourLimitReached,
                Some(format!(
                    "{} booked this week, limit {}",
                    datetime::format_duration(booked_minutes),
                    datetime::format_duration(limit_minutes)
                )),
            )));
        }
        Ok(None)
    }

    async fn check_slot_conflict(
        &self,
        lab: &Lab,
        request: &BookingRequest<'_>,
    ) -> BookingResult<Option<Decision>> {
        let existing = self
            .read(
                || self.storage.find_slot_occupying_bookings(&lab.id, request.date),
                "find_slot_occupying_bookings",
            )
            .await?;

        let clashes = ConflictDetector::conflicts_with(request.start, request.end, &existing);
        if !clashes.is_empty() {
            let ranges: Vec<String> = clashes.iter().map(|b| b.time_slot()).collect();
            return Ok(Some(Decision::reject(
                RejectionReason::TimeSlotConflict,
                Some(format!("already booked: {}", ranges.join(", "))),
            )));
        }
        Ok(None)
    }

    async fn read<F, Fut>(&self, operation: F, name: &str) -> BookingResult<Vec<Booking>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = BookingResult<Vec<Booking>>>,
    {
        retry_with_backoff(
            &self.config.read_retry,
            operation,
            BookingError::is_transient,
            name,
        )
        .await
    }
}

// ── Tests ──────────────────────────────────────────────────────
