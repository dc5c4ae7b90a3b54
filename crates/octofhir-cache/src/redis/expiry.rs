//! Expiry options applied to Redis `SET`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Expiry argument of `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpiryMode {
    /// Relative, in seconds.
    Ex,
    /// Relative, in milliseconds.
    Px,
    /// Absolute unix time, in seconds.
    ExAt,
    /// Absolute unix time, in milliseconds.
    PxAt,
}

impl ExpiryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryMode::Ex => "EX",
            ExpiryMode::Px => "PX",
            ExpiryMode::ExAt => "EXAT",
            ExpiryMode::PxAt => "PXAT",
        }
    }
}

/// Existence condition of `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SetCondition {
    /// Only set if the key does not exist.
    Nx,
    /// Only set if the key already exists.
    Xx,
}

impl SetCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetCondition::Nx => "NX",
            SetCondition::Xx => "XX",
        }
    }
}

/// `{ mode, time }` pair passed to `SET`, plus an optional condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryOptions {
    pub mode: ExpiryMode,
    pub time: u64,
    #[serde(default)]
    pub condition: Option<SetCondition>,
}

impl ExpiryOptions {
    pub fn new(mode: ExpiryMode, time: u64) -> Self {
        Self {
            mode,
            time,
            condition: None,
        }
    }

    /// Expire `secs` seconds after the write.
    pub fn seconds(secs: u64) -> Self {
        Self::new(ExpiryMode::Ex, secs)
    }

    /// Expire `ms` milliseconds after the write.
    pub fn millis(ms: u64) -> Self {
        Self::new(ExpiryMode::Px, ms)
    }

    pub fn with_condition(mut self, condition: SetCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Trailing `SET` arguments.
    pub(crate) fn append_to(&self, cmd: &mut redis::Cmd) {
        cmd.arg(self.mode.as_str()).arg(self.time);
        if let Some(condition) = self.condition {
            cmd.arg(condition.as_str());
        }
    }
}

type ExpiryFn<T> = Arc<dyn Fn(&T) -> BoxFuture<'static, ExpiryOptions> + Send + Sync>;

/// Expiry applied on every remote write: fixed, or computed per value.
pub enum RedisExpiry<T> {
    Fixed(ExpiryOptions),
    PerValue(ExpiryFn<T>),
}

impl<T: 'static> RedisExpiry<T> {
    pub fn per_value<F>(f: F) -> Self
    where
        F: Fn(&T) -> ExpiryOptions + Send + Sync + 'static,
    {
        RedisExpiry::PerValue(Arc::new(move |data: &T| {
            futures_util::future::ready(f(data)).boxed()
        }))
    }

    pub fn per_value_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ExpiryOptions> + Send + 'static,
    {
        RedisExpiry::PerValue(Arc::new(move |data: &T| f(data).boxed()))
    }
}

impl<T> RedisExpiry<T> {
    pub(crate) async fn resolve(&self, data: &T) -> ExpiryOptions {
        match self {
            RedisExpiry::Fixed(options) => *options,
            RedisExpiry::PerValue(f) => f(data).await,
        }
    }
}

impl<T> From<ExpiryOptions> for RedisExpiry<T> {
    fn from(options: ExpiryOptions) -> Self {
        RedisExpiry::Fixed(options)
    }
}

impl<T> Clone for RedisExpiry<T> {
    fn clone(&self) -> Self {
        match self {
            RedisExpiry::Fixed(options) => RedisExpiry::Fixed(*options),
            RedisExpiry::PerValue(f) => RedisExpiry::PerValue(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for RedisExpiry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedisExpiry::Fixed(options) => f.debug_tuple("Fixed").field(options).finish(),
            RedisExpiry::PerValue(_) => f.write_str("PerValue(..)"),
        }
    }
}
