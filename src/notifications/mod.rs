//! Booking lifecycle notifications
//!
//! The workflow service emits one event per state change, fire-and-forget: a
//! failed delivery is logged by the caller and never fails the operation.

pub mod event_bus;
pub mod events;

use async_trait::async_trait;

use crate::domain::BookingResult;
pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use events::{BookingEvent, EventKind, EventMessage};

/// Outbound notification collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: BookingEvent) -> BookingResult<()>;
}
