//! Tier orchestration.
//!
//! ## Read Waterfall
//!
//! ```text
//! get(id) → Local → Remote → Persistent (refetch)
//!             ↓        ↓           ↓
//!           return  backfill    backfill
//!                   Local       Local + Remote
//! ```
//!
//! ## Writes
//!
//! `set` always writes the configured cache tiers (local, then remote) and
//! only writes the persistent tier when asked to. `del` mirrors that.
//! `flush` invalidates the cache tiers and never touches the persistent tier.
//!
//! ## Consistency
//!
//! Nothing here serializes concurrent calls for the same id. Two reads that
//! both miss locally may both reach the slower tiers and both backfill; the
//! last write wins. A failing tier aborts the call, leaving faster tiers that
//! were already written ahead of slower ones.

use std::fmt;
use std::sync::Arc;

use crate::IdFn;
use crate::error::{CacheError, CacheResult};
use crate::local::{LocalCache, LocalCacheOptions};
use crate::metrics;
use crate::persistent::{PersistentStore, StoreCapabilities};
use crate::remote::RemoteCache;

/// Local tier configuration.
pub enum LocalTier<T> {
    /// No local tier.
    Disabled,
    /// Local tier with default options (no TTL, no capacity bound, no sweep).
    Defaults,
    /// Local tier with explicit options.
    Options(LocalCacheOptions<T>),
}

impl<T> Default for LocalTier<T> {
    fn default() -> Self {
        LocalTier::Disabled
    }
}

impl<T> From<LocalCacheOptions<T>> for LocalTier<T> {
    fn from(options: LocalCacheOptions<T>) -> Self {
        LocalTier::Options(options)
    }
}

impl<T> fmt::Debug for LocalTier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalTier::Disabled => f.write_str("Disabled"),
            LocalTier::Defaults => f.write_str("Defaults"),
            LocalTier::Options(options) => f.debug_tuple("Options").field(options).finish(),
        }
    }
}

/// Builder for [`Cache`].
pub struct CacheBuilder<T>
where
    T: Send + Sync + 'static,
{
    id_fn: IdFn<T>,
    local: LocalTier<T>,
    remote: Option<Arc<dyn RemoteCache<T>>>,
    persistent: Option<Arc<dyn PersistentStore<T>>>,
}

impl<T> CacheBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn local(mut self, local: impl Into<LocalTier<T>>) -> Self {
        self.local = local.into();
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteCache<T>>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn persistent(mut self, persistent: Arc<dyn PersistentStore<T>>) -> Self {
        self.persistent = Some(persistent);
        self
    }

    /// Build the cache. Starts the local sweep if one is configured.
    pub fn build(self) -> Cache<T> {
        let local = match self.local {
            LocalTier::Disabled => None,
            LocalTier::Defaults => Some(LocalCache::new(
                Arc::clone(&self.id_fn),
                LocalCacheOptions::default(),
            )),
            LocalTier::Options(options) => Some(LocalCache::new(Arc::clone(&self.id_fn), options)),
        };

        tracing::debug!(
            local = local.is_some(),
            remote = self.remote.as_ref().map(|r| r.backend_name()),
            persistent = self.persistent.is_some(),
            "cache tiers configured"
        );

        Cache {
            id_fn: self.id_fn,
            local,
            remote: self.remote,
            persistent: self.persistent,
        }
    }
}

/// Tiered cache facade for records of type `T`.
///
/// Each tier is optional; an absent tier is skipped by every operation.
pub struct Cache<T>
where
    T: Send + Sync + 'static,
{
    id_fn: IdFn<T>,
    local: Option<LocalCache<T>>,
    remote: Option<Arc<dyn RemoteCache<T>>>,
    persistent: Option<Arc<dyn PersistentStore<T>>>,
}

impl<T> Cache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start building a cache around an identity function.
    ///
    /// # Example
    ///
    /// ```
    /// use octofhir_cache::{Cache, LocalTier};
    ///
    /// #[derive(Clone)]
    /// struct Patient {
    ///     id: String,
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let cache = Cache::builder(|p: &Patient| p.id.clone())
    ///     .local(LocalTier::Defaults)
    ///     .build();
    ///
    /// cache.set(Patient { id: "123".into() }, false).await.unwrap();
    /// assert!(cache.get("123", false).await.unwrap().is_some());
    /// # }
    /// ```
    pub fn builder<F>(id_fn: F) -> CacheBuilder<T>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        CacheBuilder {
            id_fn: Arc::new(id_fn),
            local: LocalTier::Disabled,
            remote: None,
            persistent: None,
        }
    }

    /// Id of a record, as derived by the identity function.
    pub fn id_of(&self, data: &T) -> String {
        (self.id_fn)(data)
    }

    pub fn local(&self) -> Option<&LocalCache<T>> {
        self.local.as_ref()
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteCache<T>>> {
        self.remote.as_ref()
    }

    pub fn persistent(&self) -> Option<&Arc<dyn PersistentStore<T>>> {
        self.persistent.as_ref()
    }

    /// Whether [`Cache::refetch`] can succeed.
    pub fn can_refetch(&self) -> bool {
        self.persistent
            .as_ref()
            .is_some_and(|p| p.capabilities().get)
    }

    /// Read through the tiers.
    ///
    /// ## Lookup Order
    ///
    /// 1. With `force_refetch`, go straight to [`Cache::refetch`]
    /// 2. Local tier; a hit returns immediately
    /// 3. Remote tier; a hit is backfilled into the local tier
    /// 4. Persistent tier via [`Cache::refetch`], if it can get
    /// 5. Otherwise a miss
    pub async fn get(&self, id: &str, force_refetch: bool) -> CacheResult<Option<T>> {
        if force_refetch {
            return self.refetch(id).await;
        }

        if let Some(local) = &self.local {
            if let Some(data) = local.get(id) {
                tracing::debug!(id = %id, "cache hit (local)");
                metrics::record_cache_hit(metrics::tier::LOCAL);
                return Ok(Some(data));
            }
        }

        if let Some(remote) = &self.remote {
            if let Some(data) = remote.get(id).await? {
                tracing::debug!(id = %id, "cache hit (remote)");
                metrics::record_cache_hit(metrics::tier::REMOTE);
                if let Some(local) = &self.local {
                    local.set(id, data.clone()).await;
                }
                return Ok(Some(data));
            }
        }

        if self.can_refetch() {
            return self.refetch(id).await;
        }

        tracing::debug!(id = %id, "cache miss");
        metrics::record_cache_miss();
        Ok(None)
    }

    /// Load a record from the persistent tier and refill the cache tiers.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Configuration` when no persistent tier with a get
    /// capability is configured. Tier failures are returned as they are.
    pub async fn refetch(&self, id: &str) -> CacheResult<Option<T>> {
        let persistent = self
            .persistent
            .as_ref()
            .filter(|p| p.capabilities().get)
            .ok_or_else(|| CacheError::missing_capability("refetch", "get"))?;

        match persistent.get(id).await? {
            Some(data) => {
                tracing::debug!(id = %id, "refetched from persistent store");
                metrics::record_cache_hit(metrics::tier::PERSISTENT);
                self.write_cache_tiers(id, &data).await?;
                Ok(Some(data))
            }
            None => {
                tracing::debug!(id = %id, "cache miss (persistent)");
                metrics::record_cache_miss();
                Ok(None)
            }
        }
    }

    /// Write a record under the id derived from it.
    ///
    /// With `persistent`, the record is also written to the persistent tier.
    pub async fn set(&self, data: T, persistent: bool) -> CacheResult<()> {
        let id = self.id_of(&data);
        self.set_with_id(&id, data, persistent).await
    }

    /// Write a record under an explicit id.
    ///
    /// # Errors
    ///
    /// With `persistent` and no persistent set capability, returns
    /// `CacheError::Configuration` before any tier is written.
    pub async fn set_with_id(&self, id: &str, data: T, persistent: bool) -> CacheResult<()> {
        let store = if persistent {
            Some(self.require_persistent("set", "set", |c| c.set)?)
        } else {
            None
        };

        self.write_cache_tiers(id, &data).await?;

        if let Some(store) = store {
            store.set(id, &data).await?;
            tracing::debug!(id = %id, "persistent store written");
        }
        Ok(())
    }

    /// Delete a record from the cache tiers, and with `persistent` also from
    /// the persistent tier.
    ///
    /// # Errors
    ///
    /// With `persistent` and no persistent delete capability, returns
    /// `CacheError::Configuration` before any tier is touched.
    pub async fn del(&self, id: &str, persistent: bool) -> CacheResult<()> {
        let store = if persistent {
            Some(self.require_persistent("del", "del", |c| c.del)?)
        } else {
            None
        };

        if let Some(local) = &self.local {
            local.del(id);
        }
        if let Some(remote) = &self.remote {
            remote.del(id).await?;
        }
        if let Some(store) = store {
            store.del(id).await?;
        }

        tracing::debug!(id = %id, persistent, "cache entry deleted");
        Ok(())
    }

    /// Invalidate the cache tiers: clear the local store and delete the
    /// remote namespace. The persistent tier is left untouched.
    pub async fn flush(&self) -> CacheResult<()> {
        if let Some(local) = &self.local {
            local.flush();
        }
        if let Some(remote) = &self.remote {
            remote.flush().await?;
        }
        tracing::debug!("cache flushed");
        Ok(())
    }

    /// Stop the local sweep and, with `close_connection`, release the remote
    /// connection. Idempotent.
    pub async fn close(&self, close_connection: bool) -> CacheResult<()> {
        if let Some(local) = &self.local {
            local.close();
        }
        if let Some(remote) = &self.remote {
            remote.close(close_connection).await?;
        }
        Ok(())
    }

    async fn write_cache_tiers(&self, id: &str, data: &T) -> CacheResult<()> {
        if let Some(local) = &self.local {
            local.set(id, data.clone()).await;
        }
        if let Some(remote) = &self.remote {
            remote.set(id, data).await?;
        }
        Ok(())
    }

    fn require_persistent(
        &self,
        operation: &str,
        capability: &str,
        supported: impl Fn(&StoreCapabilities) -> bool,
    ) -> CacheResult<&Arc<dyn PersistentStore<T>>> {
        self.persistent
            .as_ref()
            .filter(|p| supported(&p.capabilities()))
            .ok_or_else(|| CacheError::missing_capability(operation, capability))
    }
}

impl<T> fmt::Debug for Cache<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("local", &self.local.is_some())
            .field("remote", &self.remote.as_ref().map(|r| r.backend_name()))
            .field("persistent", &self.persistent.is_some())
            .finish()
    }
}
