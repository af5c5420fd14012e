//! In-memory storage implementation
//!
//! DashMap-backed backend used by tests and by embedders that do not wire a
//! real document store. The per-lab mutex in `reserve_booking` is the
//! serialization point that closes the check-then-write double-booking race.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::traits::{StatusUpdate, Storage};
use crate::domain::{Booking, BookingError, BookingResult, BookingStatus, Lab, User};
use crate::shared::datetime;

/// In-memory storage for development and testing.
pub struct InMemoryStorage {
    labs: DashMap<String, Lab>,
    users: DashMap<String, User>,
    bookings: DashMap<String, Booking>,
    /// One lock per lab; held across the conflict re-check and insert
    lab_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Guards batch updates so they are observed all-or-nothing
    batch_lock: Mutex<()>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            labs: DashMap::new(),
            users: DashMap::new(),
            bookings: DashMap::new(),
            lab_locks: DashMap::new(),
            batch_lock: Mutex::new(()),
        }
    }

    fn lab_lock(&self, lab_id: &str) -> Arc<Mutex<()>> {
        self.lab_locks
            .entry(lab_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn slot_occupying(&self, lab_id: &str, date: NaiveDate) -> Vec<Booking> {
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.lab_id == lab_id && b.date == date && b.occupies_slot())
            .map(|b| b.clone())
            .collect();
        found.sort_by_key(|b| b.start_time);
        found
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save_lab(&self, lab: Lab) -> BookingResult<()> {
        if self.labs.contains_key(&lab.id) {
            return Err(BookingError::Conflict(format!(
                "lab {} already exists",
                lab.id
            )));
        }
        self.labs.insert(lab.id.clone(), lab);
        Ok(())
    }

    async fn get_lab(&self, id: &str) -> BookingResult<Option<Lab>> {
        Ok(self.labs.get(id).map(|l| l.clone()))
    }

    async fn update_lab(&self, lab: Lab) -> BookingResult<()> {
        if !self.labs.contains_key(&lab.id) {
            return Err(BookingError::NotFound {
                entity: "lab",
                id: lab.id,
            });
        }
        self.labs.insert(lab.id.clone(), lab);
        Ok(())
    }

    async fn list_bookable_labs(&self) -> BookingResult<Vec<Lab>> {
        let mut labs: Vec<Lab> = self
            .labs
            .iter()
            .filter(|l| l.is_bookable())
            .map(|l| l.clone())
            .collect();
        labs.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));
        Ok(labs)
    }

    async fn save_user(&self, user: User) -> BookingResult<()> {
        if self.users.contains_key(&user.id) {
            return Err(BookingError::Conflict(format!(
                "user {} already exists",
                user.id
            )));
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> BookingResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn update_user(&self, user: User) -> BookingResult<()> {
        if !self.users.contains_key(&user.id) {
            return Err(BookingError::NotFound {
                entity: "user",
                id: user.id,
            });
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> BookingResult<Option<Booking>> {
        Ok(self.bookings.get(id).map(|b| b.clone()))
    }

    async fn reserve_booking(&self, booking: Booking) -> BookingResult<Booking> {
        let lock = self.lab_lock(&booking.lab_id);
        let _guard = lock.lock().await;

        if self.bookings.contains_key(&booking.id) {
            return Err(BookingError::Conflict(format!(
                "booking {} already exists",
                booking.id
            )));
        }

        let clash: Vec<String> = self
            .slot_occupying(&booking.lab_id, booking.date)
            .into_iter()
            .filter(|existing| {
                datetime::overlaps(
                    booking.start_time,
                    booking.end_time,
                    existing.start_time,
                    existing.end_time,
                )
            })
            .map(|existing| existing.time_slot())
            .collect();

        if !clash.is_empty() {
            return Err(BookingError::Conflict(format!(
                "slot {} on {} already taken by {}",
                booking.time_slot(),
                booking.date,
                clash.join(", ")
            )));
        }

        self.bookings.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    async fn update_booking(&self, booking: Booking) -> BookingResult<()> {
        match self.bookings.entry(booking.id.clone()) {
            Entry::Vacant(_) => Err(BookingError::NotFound {
                entity: "booking",
                id: booking.id,
            }),
            Entry::Occupied(mut stored) => {
                // Compare-and-swap on the version stamp: a writer that read
                // the record before another writer committed loses here
                // instead of silently overwriting.
                if stored.get().version != booking.version {
                    return Err(BookingError::Conflict(format!(
                        "booking {} was modified concurrently",
                        booking.id
                    )));
                }
                let mut booking = booking;
                booking.version += 1;
                stored.insert(booking);
                Ok(())
            }
        }
    }

    async fn find_slot_occupying_bookings(
        &self,
        lab_id: &str,
        date: NaiveDate,
    ) -> BookingResult<Vec<Booking>> {
        Ok(self.slot_occupying(lab_id, date))
    }

    async fn find_active_bookings_for_user(&self, user_id: &str) -> BookingResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id && b.is_active())
            .map(|b| b.clone())
            .collect())
    }

    async fn find_user_bookings_in_week(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> BookingResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                b.user_id == user_id
                    && b.is_active()
                    && b.date >= week_start
                    && b.date <= week_end
            })
            .map(|b| b.clone())
            .collect())
    }

    async fn find_by_status(&self, status: BookingStatus) -> BookingResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.status == status)
            .map(|b| b.clone())
            .collect())
    }

    async fn batch_update_status(&self, updates: Vec<StatusUpdate>) -> BookingResult<Vec<Booking>> {
        let _guard = self.batch_lock.lock().await;

        // Validate everything first so a bad entry leaves nothing mutated
        let mut staged = Vec::with_capacity(updates.len());
        for update in &updates {
            let booking = self
                .bookings
                .get(&update.booking_id)
                .map(|b| b.clone())
                .ok_or_else(|| BookingError::NotFound {
                    entity: "booking",
                    id: update.booking_id.clone(),
                })?;
            if !booking.status.can_transition_to(update.status) {
                return Err(BookingError::InvalidTransition {
                    from: booking.status,
                    to: update.status,
                });
            }
            staged.push(booking);
        }

        let mut applied = Vec::with_capacity(staged.len());
        for (mut booking, update) in staged.into_iter().zip(updates) {
            booking.status = update.status;
            booking.reviewed_by = update.reviewed_by;
            booking.reviewed_at = Some(update.at);
            booking.admin_notes = update.notes;
            booking.updated_at = update.at;
            booking.version += 1;
            self.bookings.insert(booking.id.clone(), booking.clone());
            applied.push(booking);
        }
        Ok(applied)
    }
}

// ── Tests ──────────────────────────────────────────────────────
