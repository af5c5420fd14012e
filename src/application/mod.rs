//! Application services: validation, conflict detection and the workflow

pub mod booking_service;
pub mod conflict;
pub mod eligibility;
pub mod sweep;

pub use booking_service::{BookingService, CreateBooking};
pub use conflict::ConflictDetector;
pub use eligibility::{BookingRequest, Decision, EligibilityValidator};
pub use sweep::{start_sweep_task, sweep_once, SweepStats};
