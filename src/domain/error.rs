//! Domain errors and rejection reasons

use thiserror::Error;

use crate::domain::models::booking::BookingStatus;
use crate::shared::datetime::FormatError;

/// Why an otherwise well-formed booking request was turned down.
///
/// Surfaced verbatim to the caller; the order of variants mirrors the order
/// in which the eligibility checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RejectionReason {
    AccountInactive,
    VerificationRequired,
    ResourceRestricted,
    ResourceUnavailable,
    RoleNotAllowed,
    CapacityExceeded,
    EquipmentUnavailable,
    OutsideOperatingHours,
    DurationOutOfBounds,
    DateInPast,
    TooFarInAdvance,
    BookingLimitReached,
    WeeklyHourLimitReached,
    TimeSlotConflict,
}

impl RejectionReason {
    /// Stable machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::VerificationRequired => "VERIFICATION_REQUIRED",
            Self::ResourceRestricted => "RESOURCE_RESTRICTED",
            Self::ResourceUnavailable => "RESOURCE_UNAVAILABLE",
            Self::RoleNotAllowed => "ROLE_NOT_ALLOWED",
            Self::CapacityExceeded => "CAPACITY_EXCEEDED",
            Self::EquipmentUnavailable => "EQUIPMENT_UNAVAILABLE",
            Self::OutsideOperatingHours => "OUTSIDE_OPERATING_HOURS",
            Self::DurationOutOfBounds => "DURATION_OUT_OF_BOUNDS",
            Self::DateInPast => "DATE_IN_PAST",
            Self::TooFarInAdvance => "TOO_FAR_IN_ADVANCE",
            Self::BookingLimitReached => "BOOKING_LIMIT_REACHED",
            Self::WeeklyHourLimitReached => "WEEKLY_HOUR_LIMIT_REACHED",
            Self::TimeSlotConflict => "TIME_SLOT_CONFLICT",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error taxonomy of the booking core.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed date/time string; always local, never partially applied.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The eligibility validator rejected the request.
    #[error("booking rejected: {reason}")]
    Rejected {
        reason: RejectionReason,
        details: Option<String>,
    },

    /// Referenced lab/user/booking does not exist.
    #[error("not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// State-machine violation, e.g. approving a cancelled booking.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Race detected at write time despite passing validation.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// Transient I/O failure from the storage collaborator.
    #[error("storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// Whether the operation may succeed if retried (reads only).
    pub fn is_transient(&self) -> bool {
        matches!(self, BookingError::Storage(_))
    }
}

/// Result type for domain operations.
pub type BookingResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(BookingError::Storage("timeout".into()).is_transient());
        assert!(!BookingError::Conflict("slot taken".into()).is_transient());
        assert!(!BookingError::NotFound {
            entity: "lab",
            id: "lab-1".into()
        }
        .is_transient());
    }

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(RejectionReason::TimeSlotConflict.code(), "TIME_SLOT_CONFLICT");
        assert_eq!(
            RejectionReason::BookingLimitReached.to_string(),
            "BOOKING_LIMIT_REACHED"
        );
    }
}
