//! Redis implementation of the remote tier.
//!
//! Records are stored as encoded bytes under `{prefix}:{typename}:{id}`
//! through a deadpool-redis connection pool. Bulk operations walk the
//! namespace with cursor `SCAN` and never use `KEYS`.

mod expiry;

pub use expiry::{ExpiryMode, ExpiryOptions, RedisExpiry, SetCondition};

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::codec::{Codec, JsonCodec};
use crate::error::{CacheError, CacheResult};
use crate::remote::{DEFAULT_PREFIX, KeySpace, RemoteCache};

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 100;
/// Keys per `MGET`/`DEL` batch.
const BATCH_SIZE: usize = 500;

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable the Redis tier
    /// Default: false (local tier only)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,

    /// Key prefix shared by every record type
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

fn default_redis_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
            prefix: default_redis_prefix(),
        }
    }
}

/// Create a Redis connection pool and check that one connection works.
///
/// Returns `Ok(None)` when Redis is disabled in `config`.
pub async fn create_pool(config: &RedisConfig) -> CacheResult<Option<Pool>> {
    if !config.enabled {
        tracing::info!("Redis disabled, remote cache tier not configured");
        return Ok(None);
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;
    redis_config.pool = Some(pool_config);

    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(CacheError::remote)?;

    pool.get().await.map_err(CacheError::remote)?;
    tracing::info!(pool_size = config.pool_size, "Connected to Redis");

    Ok(Some(pool))
}

/// Remote tier backed by Redis.
pub struct RedisCache<T, C = JsonCodec> {
    pool: Pool,
    typename: String,
    keys: KeySpace,
    expiry: Option<RedisExpiry<T>>,
    codec: C,
}

impl<T> RedisCache<T, JsonCodec> {
    /// Redis tier for `typename` with the default `cache` prefix and JSON values.
    pub fn new(pool: Pool, typename: &str) -> Self {
        Self {
            pool,
            typename: typename.to_string(),
            keys: KeySpace::new(typename),
            expiry: None,
            codec: JsonCodec,
        }
    }
}

impl<T, C> RedisCache<T, C> {
    /// Replace the default `cache` key prefix.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.keys = KeySpace::with_prefix(prefix, &self.typename);
        self
    }

    pub fn with_expiry(mut self, expiry: impl Into<RedisExpiry<T>>) -> Self {
        self.expiry = Some(expiry.into());
        self
    }

    pub fn with_codec<C2>(self, codec: C2) -> RedisCache<T, C2> {
        RedisCache {
            pool: self.pool,
            typename: self.typename,
            keys: self.keys,
            expiry: self.expiry,
            codec,
        }
    }

    pub fn typename(&self) -> &str {
        &self.typename
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// Full Redis key for `id`.
    pub fn define_key(&self, id: &str) -> String {
        self.keys.define_key(id)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn connection(&self) -> CacheResult<Connection> {
        self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to get Redis connection");
            CacheError::remote(e)
        })
    }

    /// Every key of the namespace, following the `SCAN` cursor to the end.
    pub async fn scan_all(&self) -> CacheResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = self.keys.pattern();
        let mut found = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(CacheError::remote)?;
            found.extend(keys);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once.
        found.sort_unstable();
        found.dedup();
        Ok(found)
    }
}

#[async_trait]
impl<T, C> RemoteCache<T> for RedisCache<T, C>
where
    T: Send + Sync + 'static,
    C: Codec<T> + 'static,
{
    async fn get(&self, id: &str) -> CacheResult<Option<T>> {
        let key = self.define_key(id);
        let mut conn = self.connection().await?;
        let bytes: Option<Vec<u8>> = conn.get(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis GET error");
            CacheError::remote(e)
        })?;

        match bytes {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &str, data: &T) -> CacheResult<()> {
        let key = self.define_key(id);
        let bytes = self.codec.encode(data)?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(bytes);
        if let Some(expiry) = &self.expiry {
            expiry.resolve(data).await.append_to(&mut cmd);
        }

        let mut conn = self.connection().await?;
        let _: redis::Value = cmd.query_async(&mut conn).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis SET error");
            CacheError::remote(e)
        })?;
        tracing::debug!(key = %key, "remote cache set");
        Ok(())
    }

    async fn del(&self, id: &str) -> CacheResult<()> {
        let key = self.define_key(id);
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis DEL error");
            CacheError::remote(e)
        })?;
        Ok(())
    }

    async fn ttl(&self, id: &str) -> CacheResult<Option<Duration>> {
        let key = self.define_key(id);
        let mut conn = self.connection().await?;
        // -2: no key, -1: no expiry
        let ms: i64 = conn.pttl(&key).await.map_err(CacheError::remote)?;
        Ok(u64::try_from(ms).ok().map(Duration::from_millis))
    }

    async fn set_ttl(&self, id: &str, ttl: Duration) -> CacheResult<Option<Duration>> {
        let key = self.define_key(id);
        let ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let mut conn = self.connection().await?;
        let applied: i64 = redis::cmd("PEXPIRE")
            .arg(&key)
            .arg(ms)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::remote)?;
        Ok((applied == 1).then_some(ttl))
    }

    async fn all(&self) -> CacheResult<Vec<(String, T)>> {
        let keys = self.scan_all().await?;
        let mut conn = self.connection().await?;
        let mut records = Vec::with_capacity(keys.len());

        for batch in keys.chunks(BATCH_SIZE) {
            let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                .arg(batch)
                .query_async(&mut conn)
                .await
                .map_err(CacheError::remote)?;

            for (key, bytes) in batch.iter().zip(values) {
                // Keys may expire between SCAN and MGET.
                let Some(bytes) = bytes else { continue };
                let Some(id) = self.keys.id_of(key) else {
                    continue;
                };
                records.push((id.to_string(), self.codec.decode(&bytes)?));
            }
        }
        Ok(records)
    }

    async fn flush(&self) -> CacheResult<()> {
        let keys = self.scan_all().await?;
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        for batch in keys.chunks(BATCH_SIZE) {
            conn.del::<_, ()>(batch).await.map_err(CacheError::remote)?;
        }
        tracing::debug!(
            namespace = %self.keys.base(),
            removed = keys.len(),
            "remote cache flushed"
        );
        Ok(())
    }

    async fn close(&self, close_connection: bool) -> CacheResult<()> {
        if close_connection {
            self.pool.close();
            tracing::info!("Redis pool closed");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
