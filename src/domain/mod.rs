pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{BookingError, BookingResult, RejectionReason};
pub use models::booking::{Booking, BookingStatus};
pub use models::lab::Lab;
pub use models::user::{User, UserRole};
