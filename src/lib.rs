//! # Lab Booking Core
//!
//! Conflict-detection and eligibility-validation engine for university lab
//! reservations.
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, status state machine and errors
//! - **application**: Conflict detection, eligibility validation and the
//!   booking workflow service
//! - **infrastructure**: Storage collaborator trait and the in-memory backend
//! - **auth**: Identity collaborator with an explicit, clock-driven cache
//! - **notifications**: Booking lifecycle events and the broadcast event bus
//! - **shared**: Time/interval utilities, clock abstraction, retry helper

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod notifications;
pub mod shared;

pub use config::BookingConfig;

// Re-export the workflow entry points for easy access
pub use application::{BookingService, ConflictDetector, CreateBooking, EligibilityValidator};

// Re-export storage types
pub use infrastructure::{InMemoryStorage, Storage};

// Re-export notifications
pub use notifications::{create_event_bus, EventBus, EventKind, Notifier, SharedEventBus};
