//! Shared remote cache tier contract.
//!
//! The orchestrator only relies on the capabilities below; the wire protocol
//! is up to the implementation (see the `redis` module for the Redis one).
//!
//! ## Key Namespace
//!
//! Every record lives under `{prefix}:{typename}:{id}`, e.g.
//! `cache:Patient:123`. Bulk operations (`all`, `flush`) are scoped to the
//! `{prefix}:{typename}:` namespace, so caches of different record types can
//! share one store.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Default key prefix.
pub const DEFAULT_PREFIX: &str = "cache";

/// Capability contract of the shared remote tier.
#[async_trait]
pub trait RemoteCache<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Get a record. Absent keys are `Ok(None)`.
    async fn get(&self, id: &str) -> CacheResult<Option<T>>;

    /// Store a record, applying the tier's own expiry policy.
    async fn set(&self, id: &str, data: &T) -> CacheResult<()>;

    /// Delete a record. Deleting an absent id is not an error.
    async fn del(&self, id: &str) -> CacheResult<()>;

    /// Remaining time to live. `None` if the key is absent or never expires.
    async fn ttl(&self, id: &str) -> CacheResult<Option<Duration>>;

    /// Expire an existing key `ttl` from now.
    ///
    /// Returns `ttl`, or `None` if the key does not exist.
    async fn set_ttl(&self, id: &str, ttl: Duration) -> CacheResult<Option<Duration>>;

    /// Every `(id, record)` pair in this tier's namespace.
    async fn all(&self) -> CacheResult<Vec<(String, T)>>;

    /// Delete every key in this tier's namespace.
    async fn flush(&self) -> CacheResult<()>;

    /// Release resources; with `close_connection`, also the underlying connection.
    async fn close(&self, close_connection: bool) -> CacheResult<()>;

    /// Name of this tier for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Deterministic key namespace `{prefix}:{typename}:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    base: String,
}

impl KeySpace {
    /// Namespace with the default `cache` prefix.
    pub fn new(typename: &str) -> Self {
        Self::with_prefix(DEFAULT_PREFIX, typename)
    }

    pub fn with_prefix(prefix: &str, typename: &str) -> Self {
        Self {
            base: format!("{prefix}:{typename}:"),
        }
    }

    /// The `{prefix}:{typename}:` base every key starts with.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full key for `id`.
    pub fn define_key(&self, id: &str) -> String {
        format!("{}{}", self.base, id)
    }

    /// Glob pattern matching every key of the namespace.
    pub fn pattern(&self) -> String {
        format!("{}*", self.base)
    }

    /// Recover the id from a key of this namespace.
    pub fn id_of<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.base.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_key() {
        let keys = KeySpace::with_prefix("testsuite", "test");
        assert_eq!(keys.define_key("700"), "testsuite:test:700");
        assert_eq!(keys.pattern(), "testsuite:test:*");
    }

    #[test]
    fn test_default_prefix() {
        let keys = KeySpace::new("Patient");
        assert_eq!(keys.define_key("123"), "cache:Patient:123");
    }

    #[test]
    fn test_key_round_trip() {
        let keys = KeySpace::with_prefix("p", "t");
        let key = keys.define_key("a:b");
        assert_eq!(keys.id_of(&key), Some("a:b"));
        assert_eq!(keys.id_of("p:other:a"), None);
    }
}
