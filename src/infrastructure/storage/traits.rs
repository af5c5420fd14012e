//! Storage trait definitions
//!
//! The booking core talks to the document store only through this trait.
//! Collection-narrow queries keep the comparison sets small: conflict scans
//! fetch one lab+date, quota checks fetch one user.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{Booking, BookingResult, BookingStatus, Lab, User};

/// One entry of an atomic multi-booking status change.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub booking_id: String,
    pub status: BookingStatus,
    pub reviewed_by: Option<String>,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Storage trait for persistence operations.
#[async_trait]
pub trait Storage: Send + Sync {
    // Lab operations
    async fn save_lab(&self, lab: Lab) -> BookingResult<()>;
    async fn get_lab(&self, id: &str) -> BookingResult<Option<Lab>>;
    async fn update_lab(&self, lab: Lab) -> BookingResult<()>;
    async fn list_bookable_labs(&self) -> BookingResult<Vec<Lab>>;

    // User operations
    async fn save_user(&self, user: User) -> BookingResult<()>;
    async fn get_user(&self, id: &str) -> BookingResult<Option<User>>;
    async fn update_user(&self, user: User) -> BookingResult<()>;

    // Booking operations
    async fn get_booking(&self, id: &str) -> BookingResult<Option<Booking>>;

    /// Atomically re-check the candidate interval against slot-occupying
    /// bookings for the same lab and date, then insert. Two concurrent
    /// requests for overlapping slots cannot both succeed; the loser gets
    /// `BookingError::Conflict`.
    async fn reserve_booking(&self, booking: Booking) -> BookingResult<Booking>;

    /// Persist a mutated booking. The write is rejected with
    /// `BookingError::Conflict` when the stored record's version no longer
    /// matches the one the caller read, so two read-modify-write cycles
    /// racing on the same booking cannot both commit.
    async fn update_booking(&self, booking: Booking) -> BookingResult<()>;

    /// Bookings that occupy a slot on this lab and date (pending, approved,
    /// in-progress or overdue), ordered by start time.
    async fn find_slot_occupying_bookings(
        &self,
        lab_id: &str,
        date: NaiveDate,
    ) -> BookingResult<Vec<Booking>>;

    /// Active (quota-counting) bookings of one user.
    async fn find_active_bookings_for_user(&self, user_id: &str) -> BookingResult<Vec<Booking>>;

    /// Active bookings of one user with dates inside `[week_start, week_end]`.
    async fn find_user_bookings_in_week(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> BookingResult<Vec<Booking>>;

    /// All bookings currently in `status` (used by the sweep task).
    async fn find_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>>;

    /// Apply all updates or none. Every target must exist and every
    /// transition must be legal, otherwise nothing is written.
    async fn batch_update_status(&self, updates: Vec<StatusUpdate>) -> BookingResult<Vec<Booking>>;
}
