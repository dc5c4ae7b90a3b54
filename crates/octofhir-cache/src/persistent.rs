//! Persistent (source-of-truth) tier contract.
//!
//! Each capability is optional. A store declares what it supports through
//! [`PersistentStore::capabilities`]; the orchestrator checks that before
//! calling, and the default method bodies return a configuration error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::{CacheError, CacheResult};

/// Which operations a persistent store supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCapabilities {
    pub get: bool,
    pub set: bool,
    pub del: bool,
}

impl StoreCapabilities {
    pub const ALL: Self = Self {
        get: true,
        set: true,
        del: true,
    };

    pub const NONE: Self = Self {
        get: false,
        set: false,
        del: false,
    };
}

/// Authoritative source the cache tiers are filled from.
#[async_trait]
pub trait PersistentStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    fn capabilities(&self) -> StoreCapabilities;

    /// Load a record. `Ok(None)` means the source has no such record.
    async fn get(&self, _id: &str) -> CacheResult<Option<T>> {
        Err(CacheError::missing_capability("get", "get"))
    }

    async fn set(&self, _id: &str, _data: &T) -> CacheResult<()> {
        Err(CacheError::missing_capability("set", "set"))
    }

    async fn del(&self, _id: &str) -> CacheResult<()> {
        Err(CacheError::missing_capability("del", "del"))
    }
}

type GetFn<T> = Arc<dyn Fn(String) -> BoxFuture<'static, CacheResult<Option<T>>> + Send + Sync>;
type SetFn<T> = Arc<dyn Fn(String, T) -> BoxFuture<'static, CacheResult<()>> + Send + Sync>;
type DelFn = Arc<dyn Fn(String) -> BoxFuture<'static, CacheResult<()>> + Send + Sync>;

/// Persistent store assembled from optional async closures.
///
/// ```
/// use std::sync::Arc;
/// use dashmap::DashMap;
/// use octofhir_cache::persistent::{FnStore, PersistentStore};
///
/// let rows: Arc<DashMap<String, String>> = Arc::new(DashMap::new());
/// let reader = Arc::clone(&rows);
/// let store = FnStore::<String>::new().with_get(move |id| {
///     let rows = Arc::clone(&reader);
///     async move { Ok(rows.get(&id).map(|row| row.clone())) }
/// });
///
/// assert!(store.capabilities().get);
/// assert!(!store.capabilities().set);
/// ```
pub struct FnStore<T> {
    get_fn: Option<GetFn<T>>,
    set_fn: Option<SetFn<T>>,
    del_fn: Option<DelFn>,
}

impl<T> FnStore<T>
where
    T: Send + Sync + 'static,
{
    /// A store with no capabilities.
    pub fn new() -> Self {
        Self {
            get_fn: None,
            set_fn: None,
            del_fn: None,
        }
    }

    pub fn with_get<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CacheResult<Option<T>>> + Send + 'static,
    {
        self.get_fn = Some(Arc::new(move |id| f(id).boxed()));
        self
    }

    pub fn with_set<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CacheResult<()>> + Send + 'static,
    {
        self.set_fn = Some(Arc::new(move |id, data| f(id, data).boxed()));
        self
    }

    pub fn with_del<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CacheResult<()>> + Send + 'static,
    {
        self.del_fn = Some(Arc::new(move |id| f(id).boxed()));
        self
    }
}

impl<T> Default for FnStore<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FnStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStore")
            .field("get", &self.get_fn.is_some())
            .field("set", &self.set_fn.is_some())
            .field("del", &self.del_fn.is_some())
            .finish()
    }
}

#[async_trait]
impl<T> PersistentStore<T> for FnStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            get: self.get_fn.is_some(),
            set: self.set_fn.is_some(),
            del: self.del_fn.is_some(),
        }
    }

    async fn get(&self, id: &str) -> CacheResult<Option<T>> {
        match &self.get_fn {
            Some(f) => f(id.to_string()).await,
            None => Err(CacheError::missing_capability("get", "get")),
        }
    }

    async fn set(&self, id: &str, data: &T) -> CacheResult<()> {
        match &self.set_fn {
            Some(f) => f(id.to_string(), data.clone()).await,
            None => Err(CacheError::missing_capability("set", "set")),
        }
    }

    async fn del(&self, id: &str) -> CacheResult<()> {
        match &self.del_fn {
            Some(f) => f(id.to_string()).await,
            None => Err(CacheError::missing_capability("del", "del")),
        }
    }
}
