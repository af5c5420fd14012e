//! Crate configuration

use std::time::Duration;

use crate::shared::retry::RetryConfig;

/// Policy knobs for the booking engine.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Whether requesters must have a verified email before booking
    pub require_verification: bool,
    /// Step between generated availability slots, in minutes
    pub slot_interval_minutes: u32,
    /// How long before start a reminder becomes due, in hours
    pub reminder_lead_hours: i64,
    /// TTL for the cached identity lookups
    pub identity_cache_ttl: Duration,
    /// Retry policy for storage reads (writes are never retried)
    pub read_retry: RetryConfig,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            require_verification: true,
            slot_interval_minutes: 30,
            reminder_lead_hours: 24,
            identity_cache_ttl: Duration::from_secs(300),
            read_retry: RetryConfig::default(),
        }
    }
}
