//! Lab domain entity

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserRole;

/// A bookable lab with its operating constraints.
///
/// Labs are soft-disabled via `is_active`/`maintenance_mode` and never hard
/// deleted while bookings reference them; bookings carry a denormalized copy
/// of the lab name for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lab {
    /// Unique lab ID (opaque)
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    /// Maximum number of people allowed in one booking
    pub capacity: u32,
    /// Named equipment available in this lab
    pub resources: Vec<String>,
    /// Cost per booked hour, 0 for free labs
    pub hourly_rate: f64,
    /// Operating hours window
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    /// Minimum booking duration in minutes (never below 15)
    pub min_booking_minutes: u32,
    /// Maximum booking duration in hours (never below 1)
    pub max_booking_hours: u32,
    /// How many days in advance bookings may be placed
    pub advance_booking_days: u32,
    /// Whether bookings need admin review before they are confirmed
    pub requires_approval: bool,
    /// Roles permitted to book this lab
    pub allowed_roles: Vec<UserRole>,
    /// Ordering rank, 1 = highest
    pub priority: u32,
    pub is_active: bool,
    pub maintenance_mode: bool,
    pub maintenance_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lab {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
        capacity: u32,
        open_time: NaiveTime,
        close_time: NaiveTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            location: location.into(),
            capacity: capacity.max(1),
            resources: Vec::new(),
            hourly_rate: 0.0,
            open_time,
            close_time,
            min_booking_minutes: 30,
            max_booking_hours: 4,
            advance_booking_days: 30,
            requires_approval: true,
            allowed_roles: vec![UserRole::Student, UserRole::Faculty],
            priority: 1,
            is_active: true,
            maintenance_mode: false,
            maintenance_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// A lab accepts bookings only while active and not under maintenance.
    pub fn is_bookable(&self) -> bool {
        self.is_active && !self.maintenance_mode
    }

    pub fn allows_role(&self, role: UserRole) -> bool {
        self.allowed_roles.contains(&role)
    }

    /// Equipment from `required` that this lab does not have.
    pub fn missing_equipment(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|r| !self.resources.iter().any(|have| have == *r))
            .cloned()
            .collect()
    }

    pub fn max_booking_minutes(&self) -> u32 {
        self.max_booking_hours * 60
    }

    pub fn set_hourly_rate(&mut self, rate: f64) {
        self.hourly_rate = rate.max(0.0);
    }

    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity.max(1);
    }

    /// Duration bounds are floored at construction time: 15 minutes minimum,
    /// 1 hour maximum-duration floor.
    pub fn set_duration_bounds(&mut self, min_minutes: u32, max_hours: u32) {
        self.min_booking_minutes = min_minutes.max(15);
        self.max_booking_hours = max_hours.max(1);
    }

    pub fn enter_maintenance(&mut self, message: impl Into<String>) {
        self.maintenance_mode = true;
        self.maintenance_message = Some(message.into());
    }

    pub fn leave_maintenance(&mut self) {
        self.maintenance_mode = false;
        self.maintenance_message = None;
    }
}

// ── Tests ──────────────────────────────────────────────────────
