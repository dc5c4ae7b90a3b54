use std::time::Duration;

use tokio::time::Instant;

/// A value held by the local tier.
///
/// `expire_at` of `None` means the entry never expires by TTL (it is still
/// subject to capacity eviction). `last_used` is refreshed on every read hit
/// and is only `None` for entries restored from a snapshot that lacked it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub data: T,
    pub expire_at: Option<Instant>,
    pub last_used: Option<Instant>,
}

impl<T> Entry<T> {
    /// An entry with no expiry and no recorded use.
    pub fn new(data: T) -> Self {
        Self {
            data,
            expire_at: None,
            last_used: None,
        }
    }

    /// Set the absolute expiry instant.
    pub fn expires_at(mut self, at: Instant) -> Self {
        self.expire_at = Some(at);
        self
    }

    /// Expire `ttl` from now. A `ttl` past the clock's range leaves the
    /// entry without expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expire_at = Instant::now().checked_add(ttl);
        self
    }

    /// Set the last-used instant.
    pub fn last_used_at(mut self, at: Instant) -> Self {
        self.last_used = Some(at);
        self
    }

    /// Expired for reads: `expire_at <= now`.
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }

    /// Expired for the sweep: `expire_at < now`.
    pub(crate) fn is_stale_at(&self, now: Instant) -> bool {
        self.expire_at.is_some_and(|at| at < now)
    }
}
