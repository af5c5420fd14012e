//! Notification event types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Booking;

/// What happened to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Approved,
    Rejected,
    Cancelled,
    Reminder,
    Overdue,
    Completed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Reminder => "reminder",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to the requester's notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Recipient
    pub user_id: String,
    pub kind: EventKind,
    pub booking_id: String,
    pub lab_name: String,
    pub date: NaiveDate,
    pub time_slot: String,
    /// Free-form context: rejection reason, refund amount, etc.
    pub detail: Option<String>,
}

impl BookingEvent {
    pub fn from_booking(kind: EventKind, booking: &Booking, detail: Option<String>) -> Self {
        Self {
            user_id: booking.user_id.clone(),
            kind,
            booking_id: booking.id.clone(),
            lab_name: booking.lab_name.clone(),
            date: booking.date,
            time_slot: booking.time_slot(),
            detail,
        }
    }
}

/// Wrapper for delivering events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BookingEvent,
}

impl EventMessage {
    pub fn new(event: BookingEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&EventKind::Reminder).unwrap(),
            "\"reminder\""
        );
        let parsed: EventKind = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(parsed, EventKind::Overdue);
    }

    #[test]
    fn message_flattens_event_fields() {
        let event = BookingEvent {
            user_id: "u-1".to_string(),
            kind: EventKind::Approved,
            booking_id: "b-1".to_string(),
            lab_name: "Physics Lab".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            time_slot: "09:00 - 10:00".to_string(),
            detail: None,
        };
        let json = serde_json::to_value(EventMessage::new(event)).unwrap();

        // Flattened: event fields sit next to the envelope metadata
        assert_eq!(json["kind"], "approved");
        assert_eq!(json["booking_id"], "b-1");
        assert!(json["id"].is_string());
        assert!(json["timestamp"].is_string());
    }
}
