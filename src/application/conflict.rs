//! Time-slot conflict detection
//!
//! Pure and read-only: the caller hands in the already-fetched bookings for
//! one lab and date (slot-occupying statuses only, see the storage query) and
//! gets back the subset that clashes with the candidate interval.

use chrono::NaiveTime;

use crate::domain::Booking;
use crate::shared::datetime;

pub struct ConflictDetector;

impl ConflictDetector {
    /// Existing bookings whose interval overlaps `[start, end)`, sorted by
    /// start time. Bookings that no longer occupy their slot are skipped, so
    /// a pre-filtered input set is not required for correctness.
    ///
    /// The candidate must already satisfy `start < end`; the validator
    /// rejects non-positive durations before conflict detection runs.
    pub fn conflicts_with(start: NaiveTime, end: NaiveTime, existing: &[Booking]) -> Vec<Booking> {
        let mut clashes: Vec<Booking> = existing
            .iter()
            .filter(|b| b.occupies_slot())
            .filter(|b| datetime::overlaps(start, end, b.start_time, b.end_time))
            .cloned()
            .collect();
        clashes.sort_by_key(|b| b.start_time);
        clashes
    }

    pub fn is_slot_free(start: NaiveTime, end: NaiveTime, existing: &[Booking]) -> bool {
        Self::conflicts_with(start, end, existing).is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────────
