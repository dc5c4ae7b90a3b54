//! Plain-data cache settings loaded from TOML and environment.
//!
//! Closures (identity function, per-value TTL or expiry) cannot come from a
//! file; these settings cover the rest and convert into runtime options.
//!
//! Environment variables override the file, e.g.
//! `OCTOFHIR_CACHE__LOCAL__MAX_KEYS=500`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::cache::LocalTier;
use crate::error::{CacheError, CacheResult};
use crate::local::{EvictionPolicy, LocalCacheOptions, Ttl};

/// Default settings file looked up when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "octofhir-cache.toml";

/// Top-level cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub local: LocalCacheSettings,
    #[cfg(feature = "redis")]
    #[serde(default)]
    pub redis: crate::redis::RedisConfig,
}

impl CacheSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.local.max_keys == Some(0) {
            return Err("local.max_keys must be > 0".into());
        }
        if self.local.check_period_ms == Some(0) {
            return Err("local.check_period_ms must be > 0".into());
        }
        #[cfg(feature = "redis")]
        if self.redis.enabled && self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        Ok(())
    }
}

/// Local tier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCacheSettings {
    /// Enable the local tier
    #[serde(default = "default_local_enabled")]
    pub enabled: bool,

    /// Fixed TTL in milliseconds (no TTL when absent)
    #[serde(default)]
    pub ttl_ms: Option<u64>,

    /// Capacity bound
    #[serde(default)]
    pub max_keys: Option<usize>,

    /// Eviction policy under capacity pressure
    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// Sweep interval in milliseconds (no sweep when absent)
    #[serde(default)]
    pub check_period_ms: Option<u64>,
}

fn default_local_enabled() -> bool {
    true
}

impl Default for LocalCacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_local_enabled(),
            ttl_ms: None,
            max_keys: None,
            eviction: EvictionPolicy::default(),
            check_period_ms: None,
        }
    }
}

impl LocalCacheSettings {
    /// Runtime options for the local tier.
    pub fn to_options<T: 'static>(&self) -> LocalCacheOptions<T> {
        LocalCacheOptions {
            ttl: self.ttl_ms.map(|ms| Ttl::fixed(Duration::from_millis(ms))),
            max_keys: self.max_keys,
            eviction: self.eviction,
            check_period: self.check_period_ms.map(Duration::from_millis),
        }
    }

    /// Local tier configuration for the cache builder.
    pub fn to_tier<T: 'static>(&self) -> LocalTier<T> {
        if !self.enabled {
            LocalTier::Disabled
        } else if self.ttl_ms.is_none()
            && self.max_keys.is_none()
            && self.check_period_ms.is_none()
            && self.eviction == EvictionPolicy::default()
        {
            LocalTier::Defaults
        } else {
            LocalTier::Options(self.to_options())
        }
    }
}

/// Load settings from `path` (or [`DEFAULT_SETTINGS_FILE`]) and the
/// `OCTOFHIR_CACHE__*` environment, then validate them.
///
/// A missing file is not an error; defaults and environment still apply.
pub fn load_settings(path: Option<&Path>) -> CacheResult<CacheSettings> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    let mut builder = Config::builder();
    if path.exists() {
        builder = builder.add_source(File::from(path));
    }
    builder = builder.add_source(
        Environment::with_prefix("OCTOFHIR_CACHE")
            .try_parsing(true)
            .separator("__"),
    );

    let cfg = builder
        .build()
        .map_err(|e| CacheError::settings(format!("config build error: {e}")))?;
    let settings: CacheSettings = cfg
        .try_deserialize()
        .map_err(|e| CacheError::settings(format!("config deserialize error: {e}")))?;
    settings.validate().map_err(CacheError::settings)?;
    Ok(settings)
}
