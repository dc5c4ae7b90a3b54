//! Tiered caching for OctoFHIR records.
//!
//! A [`Cache`] sits in front of up to three tiers and keeps them in step:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Cache<T>                         │
//! │  get / refetch / set / del / flush / close               │
//! └──────────────┬──────────────────┬───────────────────┬────┘
//!                │                  │                   │
//!        ┌───────┴──────┐   ┌───────┴───────┐   ┌───────┴────────┐
//!        │  LocalCache  │   │  RemoteCache  │   │ PersistentStore│
//!        │  (IndexMap,  │   │  (Redis, any  │   │ (source of     │
//!        │  TTL, sweep) │   │   shared kv)  │   │  truth)        │
//!        └──────────────┘   └───────────────┘   └────────────────┘
//! ```
//!
//! Records are keyed by a string id derived from the record itself by the
//! identity function given to [`Cache::builder`].
//!
//! ## Features
//!
//! - `redis` (default): the [`redis::RedisCache`] remote tier and its
//!   connection pool setup.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod local;
pub mod metrics;
pub mod persistent;
#[cfg(feature = "redis")]
pub mod redis;
pub mod remote;

use std::sync::Arc;

/// Identity function: derives the cache id of a record.
pub type IdFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

pub use cache::{Cache, CacheBuilder, LocalTier};
pub use codec::{Codec, JsonCodec, MessagePackCodec};
pub use config::{CacheSettings, LocalCacheSettings, load_settings};
pub use error::{CacheError, CacheResult, ErrorCategory};
pub use local::{Entry, EvictionPolicy, LocalCache, LocalCacheOptions, LocalCacheStats, Ttl};
pub use persistent::{FnStore, PersistentStore, StoreCapabilities};
pub use remote::{KeySpace, RemoteCache};

#[cfg(feature = "redis")]
pub use crate::redis::{RedisCache, RedisConfig, create_pool};
