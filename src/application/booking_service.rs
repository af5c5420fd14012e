//! Booking workflow service
//!
//! The single entry point for every state-changing booking operation. Each
//! call loads the records it needs, runs the eligibility pipeline where
//! applicable, persists through the storage collaborator and emits one
//! notification per state change. Notification failures are logged and never
//! fail the operation; everything else propagates.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::conflict::ConflictDetector;
use crate::application::eligibility::{BookingRequest, EligibilityValidator};
use crate::config::BookingConfig;
use crate::domain::{Booking, BookingError, BookingResult, BookingStatus, Lab, User};
use crate::infrastructure::storage::{StatusUpdate, Storage};
use crate::notifications::{BookingEvent, EventKind, Notifier};
use crate::shared::datetime::{self, TimeSlot};
use crate::shared::retry::retry_with_backoff;
use crate::shared::Clock;

/// Everything needed to place a booking. Date and times arrive as strings
/// from the caller and are parsed strictly before anything else runs.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: String,
    pub lab_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub purpose: String,
    pub participants: u32,
    pub required_resources: Vec<String>,
}

pub struct BookingService {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
    validator: EligibilityValidator,
}

impl BookingService {
    pub fn new(
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        let validator =
            EligibilityValidator::new(storage.clone(), clock.clone(), config.clone());
        Self {
            storage,
            notifier,
            clock,
            config,
            validator,
        }
    }

    /// Create a booking: parse, load, validate, price, reserve, notify.
    ///
    /// The storage reserve re-checks the slot under the per-lab serialization
    /// point, so two concurrent requests for overlapping slots cannot both
    /// succeed. A write-time conflict is retried once (the clash may have
    /// been released in between) and then surfaced.
    pub async fn create_booking(&self, request: CreateBooking) -> BookingResult<Booking> {
        let date = datetime::parse_date(&request.date)?;
        let start = datetime::parse_time(&request.start_time)?;
        let end = datetime::parse_time(&request.end_time)?;

        let user = self.load_user(&request.user_id).await?;
        let lab = self.load_lab(&request.lab_id).await?;

        let candidate = BookingRequest {
            date,
            start,
            end,
            participants: request.participants,
            required_resources: &request.required_resources,
        };
        self.validator
            .validate(&user, &lab, &candidate)
            .await?
            .into_result()?;

        let now = self.clock.now();
        let mut booking = Booking::new(
            Uuid::new_v4().to_string(),
            lab.id.clone(),
            user.id.clone(),
            date,
            start,
            end,
            request.purpose,
            now,
        );
        booking.lab_name = lab.name.clone();
        booking.user_name = user.name.clone();
        booking.user_email = user.email.clone();
        booking.participants = request.participants;
        booking.required_resources = request.required_resources;
        booking.total_cost = booking.duration_hours() * lab.hourly_rate;

        // Labs without an approval queue confirm immediately; so do bookings
        // from exempt users. No reviewer is stamped in either case.
        if !lab.requires_approval || user.exempt_from_approval {
            booking.status = BookingStatus::Approved;
        }

        let stored = match self.storage.reserve_booking(booking.clone()).await {
            Ok(stored) => stored,
            Err(BookingError::Conflict(details)) => {
                warn!(
                    lab_id = %lab.id,
                    %details,
                    "write-time slot conflict, retrying once"
                );
                self.storage.reserve_booking(booking).await?
            }
            Err(err) => return Err(err),
        };

        info!(
            booking_id = %stored.id,
            lab_id = %stored.lab_id,
            user_id = %stored.user_id,
            status = %stored.status,
            "booking created"
        );
        self.notify(EventKind::Created, &stored, None).await;
        Ok(stored)
    }

    /// Approve a pending booking. Anything else is an invalid transition.
    pub async fn approve(
        &self,
        booking_id: &str,
        admin_id: &str,
        notes: Option<String>,
    ) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id).await?;
        booking.approve(admin_id, notes, self.clock.now())?;
        self.storage.update_booking(booking.clone()).await?;

        info!(booking_id, admin_id, "booking approved");
        self.notify(EventKind::Approved, &booking, None).await;
        Ok(booking)
    }

    /// Reject a pending booking with a reason shown to the requester.
    pub async fn reject(
        &self,
        booking_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id).await?;
        booking.reject(admin_id, reason, self.clock.now())?;
        self.storage.update_booking(booking.clone()).await?;

        info!(booking_id, admin_id, "booking rejected");
        self.notify(EventKind::Rejected, &booking, Some(reason.to_string()))
            .await;
        Ok(booking)
    }

    /// Cancel an active booking before its start time. Paid bookings are
    /// refunded on a tier: full with 24h notice, half with 4h, else nothing.
    pub async fn cancel(
        &self,
        booking_id: &str,
        reason: &str,
        actor_id: &str,
    ) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id).await?;
        let now = self.clock.now();

        let refund = if booking.total_cost > 0.0 {
            let notice = datetime::hours_until(booking.date, booking.start_time, now);
            let amount = if notice >= 24 {
                booking.total_cost
            } else if notice >= 4 {
                booking.total_cost * 0.5
            } else {
                0.0
            };
            Some(amount)
        } else {
            None
        };

        booking.cancel(reason, now)?;
        booking.refund_amount = refund;
        self.storage.update_booking(booking.clone()).await?;

        info!(
            booking_id,
            actor_id,
            refund = ?booking.refund_amount,
            "booking cancelled"
        );
        let detail = refund.map(|amount| format!("refund: {amount:.2}"));
        self.notify(EventKind::Cancelled, &booking, detail).await;
        Ok(booking)
    }

    pub async fn check_in(&self, booking_id: &str) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id).await?;
        booking.check_in(self.clock.now())?;
        self.storage.update_booking(booking.clone()).await?;

        info!(booking_id, "checked in");
        Ok(booking)
    }

    /// Check out and complete; records actual usage from the check-in stamp.
    pub async fn check_out(&self, booking_id: &str) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id).await?;
        booking.check_out(self.clock.now())?;
        self.storage.update_booking(booking.clone()).await?;

        info!(
            booking_id,
            usage_minutes = ?booking.actual_usage_minutes,
            "checked out"
        );
        self.notify(EventKind::Completed, &booking, None).await;
        Ok(booking)
    }

    /// Approve a batch of pending bookings atomically. One bad id fails the
    /// whole batch and nothing is written; on success each requester gets a
    /// notification.
    pub async fn batch_approve(
        &self,
        booking_ids: &[String],
        admin_id: &str,
        notes: Option<String>,
    ) -> BookingResult<Vec<Booking>> {
        let now = self.clock.now();
        let updates: Vec<StatusUpdate> = booking_ids
            .iter()
            .map(|id| StatusUpdate {
                booking_id: id.clone(),
                status: BookingStatus::Approved,
                reviewed_by: Some(admin_id.to_string()),
                notes: notes.clone(),
                at: now,
            })
            .collect();

        let approved = self.storage.batch_update_status(updates).await?;
        info!(count = approved.len(), admin_id, "batch approved");

        for booking in &approved {
            self.notify(EventKind::Approved, booking, None).await;
        }
        Ok(approved)
    }

    /// Availability listing: every slot of `duration_minutes` inside the
    /// lab's operating hours, marked unavailable where an existing booking
    /// overlaps.
    pub async fn available_slots(
        &self,
        lab_id: &str,
        date: &str,
        duration_minutes: u32,
    ) -> BookingResult<Vec<TimeSlot>> {
        let date = datetime::parse_date(date)?;
        let lab = self.load_lab(lab_id).await?;
        let existing = self
            .read_bookings(
                || self.storage.find_slot_occupying_bookings(lab_id, date),
                "find_slot_occupying_bookings",
            )
            .await?;

        let mut slots = datetime::available_slots(
            lab.open_time,
            lab.close_time,
            duration_minutes,
            self.config.slot_interval_minutes,
        );
        for slot in &mut slots {
            slot.available = ConflictDetector::is_slot_free(slot.start, slot.end, &existing);
        }
        Ok(slots)
    }

    /// Labs currently accepting bookings, ordered by priority then name.
    pub async fn bookable_labs(&self) -> BookingResult<Vec<Lab>> {
        retry_with_backoff(
            &self.config.read_retry,
            || self.storage.list_bookable_labs(),
            BookingError::is_transient,
            "list_bookable_labs",
        )
        .await
    }

    /// Active booked hours of a user in the ISO week containing `date`.
    pub async fn user_weekly_hours(&self, user_id: &str, date: &str) -> BookingResult<f64> {
        let date = datetime::parse_date(date)?;
        let (week_start, week_end) = datetime::week_bounds(date);
        let bookings = self
            .read_bookings(
                || {
                    self.storage
                        .find_user_bookings_in_week(user_id, week_start, week_end)
                },
                "find_user_bookings_in_week",
            )
            .await?;
        let minutes: i64 = bookings.iter().map(|b| b.duration_minutes()).sum();
        Ok(minutes as f64 / 60.0)
    }

    pub async fn get_booking(&self, booking_id: &str) -> BookingResult<Booking> {
        self.load_booking(booking_id).await
    }

    // ── Internal helpers ───────────────────────────────────────

    async fn load_user(&self, id: &str) -> BookingResult<User> {
        let found = retry_with_backoff(
            &self.config.read_retry,
            || self.storage.get_user(id),
            BookingError::is_transient,
            "get_user",
        )
        .await?;
        found.ok_or_else(|| BookingError::NotFound {
            entity: "user",
            id: id.to_string(),
        })
    }

    async fn load_lab(&self, id: &str) -> BookingResult<Lab> {
        let found = retry_with_backoff(
            &self.config.read_retry,
            || self.storage.get_lab(id),
            BookingError::is_transient,
            "get_lab",
        )
        .await?;
        found.ok_or_else(|| BookingError::NotFound {
            entity: "lab",
            id: id.to_string(),
        })
    }

    async fn load_booking(&self, id: &str) -> BookingResult<Booking> {
        let found = retry_with_backoff(
            &self.config.read_retry,
            || self.storage.get_booking(id),
            BookingError::is_transient,
            "get_booking",
        )
        .await?;
        found.ok_or_else(|| BookingError::NotFound {
            entity: "booking",
            id: id.to_string(),
        })
    }

    async fn read_bookings<F, Fut>(&self, operation: F, name: &str) -> BookingResult<Vec<Booking>>
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

    /// Fire-and-forget delivery. A notification must never fail a booking
    /// operation that already committed.
    async fn notify(&self, kind: EventKind, booking: &Booking, detail: Option<String>) {
        let event = BookingEvent::from_booking(kind, booking, detail);
        if let Err(err) = self.notifier.notify(event).await {
            warn!(
                booking_id = %booking.id,
                kind = %kind,
                error = %err,
                "notification delivery failed"
            );
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RejectionReason, UserRole};
    use crate::infrastructure::InMemoryStorage;
    use crate::notifications::EventBus;
    use crate::shared::datetime::{parse_date, parse_time, to_instant};
    use crate::shared::ManualClock;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};

    // "Now" for all tests: Sunday 2026-03-08, 12:00 UTC.
    fn now() -> chrono::DateTime<chrono::Utc> {
        to_instant(
            parse_date("2026-03-08").unwrap(),
            parse_time("12:00").unwrap(),
        )
    }

    struct Harness {
        service: BookingService,
        storage: Arc<InMemoryStorage>,
        bus: Arc<EventBus>,
        clock: Arc<ManualClock>,
    }

    async fn harness() -> Harness {
        let storage = Arc::new(InMemoryStorage::new());
        let bus = Arc::new(EventBus::new());
        let clock = Arc::new(ManualClock::new(now()));
        let service = BookingService::new(
            storage.clone(),
            bus.clone(),
            clock.clone(),
            BookingConfig::default(),
        );

        let mut student = User::new("u-1", "Dana", "dana@uni.edu", UserRole::Student);
        student.is_verified = true;
        storage.save_user(student).await.unwrap();

        let admin = User::new("admin-1", "Root", "root@uni.edu", UserRole::Admin);
        storage.save_user(admin).await.unwrap();

        let mut lab = Lab::new(
            "lab-1",
            "Chemistry Lab",
            "Building A",
            10,
            parse_time("08:00").unwrap(),
            parse_time("18:00").unwrap(),
        );
        lab.set_hourly_rate(10.0);
        storage.save_lab(lab).await.unwrap();

        Harness {
            service,
            storage,
            bus,
            clock,
        }
    }

    fn create_request(date: &str, start: &str, end: &str) -> CreateBooking {
        CreateBooking {
            user_id: "u-1".into(),
            lab_id: "lab-1".into(),
            date: date.into(),
            start_time: start.into(),
            end_time: end.into(),
            purpose: "Titration practice".into(),
            participants: 2,
            required_resources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_prices_and_queues_for_approval() {
        let h = harness().await;
        let mut sub = h.bus.subscribe();

        let booking = h
            .service
            .create_booking(create_request("2026-03-10", "09:00", "11:00"))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_cost, 20.0);
        assert_eq!(booking.lab_name, "Chemistry Lab");
        assert_eq!(booking.user_name, "Dana");

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.event.kind, EventKind::Created);
        assert_eq!(msg.event.booking_id, booking.id);
    }

    #[tokio::test]
    async fn create_auto_approves_when_no_review_needed() {
        let h = harness().await;

        let mut lab = h.storage.get_lab("lab-1").await.unwrap().unwrap();
        lab.requires_approval = false;
        h.storage.update_lab(lab).await.unwrap();

        let booking = h
            .service
            .create_booking(create_request("2026-03-10", "09:00", "10:00"))
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Approved);
        assert!(booking.reviewed_by.is_none());
    }

    #[tokio::test]
    async fn create_rejects_with_first_failed_reason() {
        let h = harness().await;

        let err = h
            .service
            .create_booking(create_request("2026-03-10", "06:00", "07:00"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Rejected {
                reason: RejectionReason::OutsideOperatingHours,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn create_fails_on_unknown_records() {
        let h = harness().await;

        let mut req = create_request("2026-03-10", "09:00", "10:00");
        req.user_id = "ghost".into();
        let err = h.service.create_booking(req).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: "user", .. }));

        let mut req = create_request("2026-03-10", "09:00", "10:00");
        req.lab_id = "lab-404".into();
        let err = h.service.create_booking(req).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: "lab", .. }));
    }

    #[tokio::test]
    async fn create_rejects_malformed_date() {
        let h = harness().await;
        let err = h
            .service
            .create_booking(create_request("10/03/2026", "09:00", "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Format(_)));
    }

    /// Storage double whose `reserve_booking` reports a write-time conflict
    /// a configured number of times before delegating, as if a racing writer
    /// kept grabbing the slot first.
    struct ContendedStorage {
        inner: InMemoryStorage,
        conflicts_left: AtomicU32,
        reserve_attempts: AtomicU32,
    }

    #[async_trait::async_trait]
    impl Storage for ContendedStorage {
        async fn save_lab(&self, lab: Lab) -> BookingResult<()> {
            self.inner.save_lab(lab).await
        }
        async fn get_lab(&self, id: &str) -> BookingResult<Option<Lab>> {
            self.inner.get_lab(id).await
        }
        async fn update_lab(&self, lab: Lab) -> BookingResult<()> {
            self.inner.update_lab(lab).await
        }
        async fn list_bookable_labs(&self) -> BookingResult<Vec<Lab>> {
            self.inner.list_bookable_labs().await
        }
        async fn save_user(&self, user: User) -> BookingResult<()> {
            self.inner.save_user(user).await
        }
        async fn get_user(&self, id: &str) -> BookingResult<Option<User>> {
            self.inner.get_user(id).await
        }
        async fn update_user(&self, user: User) -> BookingResult<()> {
            self.inner.update_user(user).await
        }
        async fn get_booking(&self, id: &str) -> BookingResult<Option<Booking>> {
            self.inner.get_booking(id).await
        }
        async fn reserve_booking(&self, booking: Booking) -> BookingResult<Booking> {
            self.reserve_attempts.fetch_add(1, Ordering::SeqCst);
            if self
                .conflicts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(BookingError::Conflict("slot grabbed by racer".into()));
            }
            self.inner.reserve_booking(booking).await
        }
        async fn update_booking(&self, booking: Booking) -> BookingResult<()> {
            self.inner.update_booking(booking).await
        }
        async fn find_slot_occupying_bookings(
            &self,
            lab_id: &str,
            date: chrono::NaiveDate,
        ) -> BookingResult<Vec<Booking>> {
            self.inner.find_slot_occupying_bookings(lab_id, date).await
        }
        async fn find_active_bookings_for_user(
            &self,
            user_id: &str,
        ) -> BookingResult<Vec<Booking>> {
            self.inner.find_active_bookings_for_user(user_id).await
        }
        async fn find_user_bookings_in_week(
            &self,
            user_id: &str,
            week_start: chrono::NaiveDate,
            week_end: chrono::NaiveDate,
        ) -> BookingResult<Vec<Booking>> {
            self.inner
                .find_user_bookings_in_week(user_id, week_start, week_end)
                .await
        }
        async fn find_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>> {
            self.inner.find_by_status(status).await
        }
        async fn batch_update_status(
            &self,
            updates: Vec<StatusUpdate>,
        ) -> BookingResult<Vec<Booking>> {
            self.inner.batch_update_status(updates).await
        }
    }

    async fn contended_harness(conflicts: u32) -> (BookingService, Arc<ContendedStorage>) {
        let storage = Arc::new(ContendedStorage {
            inner: InMemoryStorage::new(),
            conflicts_left: AtomicU32::new(conflicts),
            reserve_attempts: AtomicU32::new(0),
        });

        let mut student = User::new("u-1", "Dana", "dana@uni.edu", UserRole::Student);
        student.is_verified = true;
        storage.save_user(student).await.unwrap();
        let lab = Lab::new(
            "lab-1",
            "Chemistry Lab",
            "Building A",
            10,
            parse_time("08:00").unwrap(),
            parse_time("18:00").unwrap(),
        );
        storage.save_lab(lab).await.unwrap();

        let service = BookingService::new(
            storage.clone(),
            Arc::new(EventBus::new()),
            Arc::new(ManualClock::new(now())),
            BookingConfig::default(),
        );
        (service, storage)
    }

    #[tokio::test]
    async fn write_conflict_is_retried_once_then_succeeds() {
        let (service, storage) = contended_harness(1).await;

        let booking = service
            .create_booking(create_request("2026-03-10", "09:00", "10:00"))
            .await
            .unwrap();

        assert_eq!(storage.reserve_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(storage
            .get_booking(&booking.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn persistent_write_conflict_surfaces_after_one_retry() {
        let (service, storage) = contended_harness(2).await;

        let err = service
            .create_booking(create_request("2026-03-10", "09:00", "10:00"))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Conflict(_)));
        // Exactly one retry: the first attempt plus one more, never a loop
        assert_eq!(storage.reserve_attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_request_for_same_slot_conflicts() {
        let h = harness().await;
        h.service
            .create_booking(create_request("2026-03-10", "10:00", "11:00"))
            .await
            .unwrap();

        // Different user, overlapping slot
        let mut second = User::new("u-2", "Eli", "eli@uni.edu", UserRole::Faculty);
        second.is_verified = true;
        h.storage.save_user(second).await.unwrap();

        let mut req = create_request("2026-03-10", "10:30", "11:30");
        req.user_id = "u-2".into();
        let err = h.service.create_booking(req).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::Rejected {
                reason: RejectionReason::TimeSlotConflict,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn approve_reject_are_pending_only() {
        let h = harness().await;
        let booking = h
            .service
            .create_booking(create_request("2026-03-10", "09:00", "10:00"))
            .await
            .unwrap();

        let approved = h
            .service
            .approve(&booking.id, "admin-1", Some("ok".into()))
            .await
            .unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("admin-1"));

        // Second approve must fail, not silently succeed
        let err = h
            .service
            .approve(&booking.id, "admin-2", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));

        let err = h
            .service
            .reject(&booking.id, "admin-1", "too late")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancel_refund_tiers() {
        let h = harness().await;

        // Booking at 2026-03-10 09:00, cost 20.0; now is 2026-03-08 12:00
        let full = h
            .service
            .create_booking(create_request("2026-03-10", "09:00", "11:00"))
            .await
            .unwrap();
        let cancelled = h.service.cancel(&full.id, "plans changed", "u-1").await.unwrap();
        assert_eq!(cancelled.refund_amount, Some(20.0));
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("plans changed")
        );

        // With under 24h notice only half comes back
        let half = h
            .service
            .create_booking(create_request("2026-03-09", "09:00", "11:00"))
            .await
            .unwrap();
        let cancelled = h.service.cancel(&half.id, "sick", "u-1").await.unwrap();
        assert_eq!(cancelled.refund_amount, Some(10.0));

        // Under 4h notice nothing comes back
        let none = h
            .service
            .create_booking(create_request("2026-03-08", "14:00", "16:00"))
            .await
            .unwrap();
        let cancelled = h.service.cancel(&none.id, "sick", "u-1").await.unwrap();
        assert_eq!(cancelled.refund_amount, Some(0.0));
    }

    #[tokio::test]
    async fn cancel_blocked_after_start() {
        let h = harness().await;
        let booking = h
            .service
            .create_booking(create_request("2026-03-09", "09:00", "10:00"))
            .await
            .unwrap();

        h.clock.set(booking.start_instant() + Duration::minutes(5));
        let err = h.service.cancel(&booking.id, "oops", "u-1").await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn check_in_out_records_usage() {
        let h = harness().await;
        let booking = h
            .service
            .create_booking(create_request("2026-03-09", "09:00", "11:00"))
            .await
            .unwrap();
        h.service.approve(&booking.id, "admin-1", None).await.unwrap();

        h.clock.set(booking.start_instant());
        let started = h.service.check_in(&booking.id).await.unwrap();
        assert_eq!(started.status, BookingStatus::InProgress);

        h.clock.advance(Duration::minutes(110));
        let done = h.service.check_out(&booking.id).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert_eq!(done.actual_usage_minutes, Some(110));
    }

    #[tokio::test]
    async fn check_in_requires_approval_first() {
        let h = harness().await;
        let booking = h
            .service
            .create_booking(create_request("2026-03-09", "09:00", "10:00"))
            .await
            .unwrap();

        let err = h.service.check_in(&booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn batch_approve_is_all_or_nothing() {
        let h = harness().await;
        let first = h
            .service
            .create_booking(create_request("2026-03-10", "09:00", "10:00"))
            .await
            .unwrap();
        let second = h
            .service
            .create_booking(create_request("2026-03-11", "09:00", "10:00"))
            .await
            .unwrap();

        // One unknown id poisons the whole batch
        let ids = vec![first.id.clone(), "ghost".to_string(), second.id.clone()];
        let err = h
            .service
            .batch_approve(&ids, "admin-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));
        let untouched = h.service.get_booking(&first.id).await.unwrap();
        assert_eq!(untouched.status, BookingStatus::Pending);

        // Clean batch approves everything and notifies per booking
        let mut sub = h.bus.subscribe();
        let ids = vec![first.id.clone(), second.id.clone()];
        let approved = h
            .service
            .batch_approve(&ids, "admin-1", Some("bulk".into()))
            .await
            .unwrap();
        assert_eq!(approved.len(), 2);
        assert!(approved
            .iter()
            .all(|b| b.status == BookingStatus::Approved));

        for _ in 0..2 {
            let msg = sub.recv().await.unwrap();
            assert_eq!(msg.event.kind, EventKind::Approved);
        }
    }

    #[tokio::test]
    async fn availability_listing_marks_taken_slots() {
        let h = harness().await;
        h.service
            .create_booking(create_request("2026-03-10", "09:00", "10:00"))
            .await
            .unwrap();

        let slots = h
            .service
            .available_slots("lab-1", "2026-03-10", 60)
            .await
            .unwrap();

        let nine = slots
            .iter()
            .find(|s| s.start == parse_time("09:00").unwrap())
            .unwrap();
        assert!(!nine.available);
        let eight_thirty = slots
            .iter()
            .find(|s| s.start == parse_time("08:30").unwrap())
            .unwrap();
        assert!(!eight_thirty.available);
        let ten = slots
            .iter()
            .find(|s| s.start == parse_time("10:00").unwrap())
            .unwrap();
        assert!(ten.available);
    }

    #[tokio::test]
    async fn lab_listing_skips_maintenance() {
        let h = harness().await;
        let mut closed = Lab::new(
            "lab-2",
            "Welding Shop",
            "Building C",
            5,
            parse_time("08:00").unwrap(),
            parse_time("18:00").unwrap(),
        );
        closed.enter_maintenance("annual inspection");
        h.storage.save_lab(closed).await.unwrap();

        let labs = h.service.bookable_labs().await.unwrap();
        let ids: Vec<_> = labs.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["lab-1"]);
    }

    #[tokio::test]
    async fn weekly_hours_summed() {
        let h = harness().await;
        h.service
            .create_booking(create_request("2026-03-10", "09:00", "11:00"))
            .await
            .unwrap();
        h.service
            .create_booking(create_request("2026-03-12", "14:00", "15:30"))
            .await
            .unwrap();

        let hours = h
            .service
            .user_weekly_hours("u-1", "2026-03-09")
            .await
            .unwrap();
        assert_eq!(hours, 3.5);

        // A different week counts nothing
        let hours = h
            .service
            .user_weekly_hours("u-1", "2026-03-20")
            .await
            .unwrap();
        assert_eq!(hours, 0.0);
    }
}
