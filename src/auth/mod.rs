//! Identity collaborator
//!
//! Booking operations need the caller's user record for role, quota and
//! verification checks. The provider trait hides where that record comes
//! from; `CachedIdentity` puts an explicit TTL cache in front of it so a
//! burst of requests does not re-fetch the same profile.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::domain::{BookingResult, User};
use crate::shared::Clock;

/// Source of authenticated user records.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Id of the currently authenticated caller, if any.
    fn current_user_id(&self) -> Option<String>;

    async fn fetch_user(&self, user_id: &str) -> BookingResult<Option<User>>;
}

/// TTL cache in front of an [`IdentityProvider`].
///
/// Entries are stamped with the fetch instant and checked against the TTL
/// on every read. Stale entries are refetched, never served.
pub struct CachedIdentity {
    inner: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    cache: DashMap<String, (User, DateTime<Utc>)>,
}

impl CachedIdentity {
    pub fn new(inner: Arc<dyn IdentityProvider>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(300));
        Self {
            inner,
            clock,
            ttl,
            cache: DashMap::new(),
        }
    }

    /// Drop a cached entry, forcing the next read to hit the provider.
    /// Called after profile mutations so the next check sees fresh data.
    pub fn invalidate(&self, user_id: &str) {
        self.cache.remove(user_id);
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl IdentityProvider for CachedIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.inner.current_user_id()
    }

    async fn fetch_user(&self, user_id: &str) -> BookingResult<Option<User>> {
        let now = self.clock.now();
        if let Some(entry) = self.cache.get(user_id) {
            let (user, fetched_at) = entry.value();
            if now - *fetched_at < self.ttl {
                return Ok(Some(user.clone()));
            }
        }

        let fetched = self.inner.fetch_user(user_id).await?;
        match &fetched {
            Some(user) => {
                self.cache.insert(user_id.to_string(), (user.clone(), now));
            }
            None => {
                debug!(user_id, "identity lookup returned no record");
                self.cache.remove(user_id);
            }
        }
        Ok(fetched)
    }
}

// ─────────────────────────── Tests ───────────────────────────
