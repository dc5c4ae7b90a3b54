//! Time-to-live policy for the local tier.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

type TtlFn<T> = Arc<dyn Fn(&T) -> BoxFuture<'static, Option<Duration>> + Send + Sync>;

/// How long a locally cached value lives.
///
/// Either a fixed duration or a function computed from the value being
/// written. The function may be asynchronous; the write awaits it before
/// committing the entry. A zero duration (or `None` from the function) means
/// the entry has no TTL and only leaves the cache through `del`, `flush` or
/// capacity eviction.
pub enum Ttl<T> {
    /// The same TTL for every write.
    Fixed(Duration),
    /// TTL computed per written value.
    PerValue(TtlFn<T>),
}

impl<T: 'static> Ttl<T> {
    /// Fixed TTL for every entry.
    pub fn fixed(ttl: Duration) -> Self {
        Ttl::Fixed(ttl)
    }

    /// TTL computed synchronously from the value.
    pub fn per_value<F>(f: F) -> Self
    where
        F: Fn(&T) -> Option<Duration> + Send + Sync + 'static,
    {
        Ttl::PerValue(Arc::new(move |data: &T| futures_util::future::ready(f(data)).boxed()))
    }

    /// TTL computed asynchronously from the value.
    ///
    /// The returned future must own whatever it needs from the value.
    pub fn per_value_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Duration>> + Send + 'static,
    {
        Ttl::PerValue(Arc::new(move |data: &T| f(data).boxed()))
    }
}

impl<T> Ttl<T> {
    /// Resolve the TTL for a value about to be written.
    pub(crate) async fn resolve(&self, data: &T) -> Option<Duration> {
        let ttl = match self {
            Ttl::Fixed(ttl) => Some(*ttl),
            Ttl::PerValue(f) => f(data).await,
        };
        ttl.filter(|ttl| !ttl.is_zero())
    }
}

impl<T> Clone for Ttl<T> {
    fn clone(&self) -> Self {
        match self {
            Ttl::Fixed(ttl) => Ttl::Fixed(*ttl),
            Ttl::PerValue(f) => Ttl::PerValue(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Ttl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Fixed(ttl) => f.debug_tuple("Fixed").field(ttl).finish(),
            Ttl::PerValue(_) => f.write_str("PerValue(..)"),
        }
    }
}

impl<T> From<Duration> for Ttl<T> {
    fn from(ttl: Duration) -> Self {
        Ttl::Fixed(ttl)
    }
}
