//! In-process cache tier.
//!
//! ## Expiry
//!
//! TTLs are converted into absolute expiry instants at write time. Reads
//! detect expired entries lazily and drop them; a periodic sweep (or an
//! explicit [`LocalCache::cleanup`]) removes the rest.
//!
//! ## Capacity
//!
//! With `max_keys` set, each cleanup pass trims the store back to `max_keys`
//! entries using the configured [`EvictionPolicy`]. Writes never evict
//! synchronously, so the store may sit above capacity until the next pass.
//!
//! ## Ordering
//!
//! The store is an [`IndexMap`], so iteration follows insertion order. That
//! order backs [`EvictionPolicy::First`]. Re-setting an existing id keeps its
//! original position.

mod entry;
mod eviction;
mod ttl;

pub use entry::Entry;
pub use eviction::EvictionPolicy;
pub use ttl::Ttl;

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::IdFn;
use crate::metrics;

/// Snapshot of the local store, in store order.
pub type Snapshot<T> = IndexMap<String, Entry<T>>;

/// Options for the local tier, resolved once at construction.
pub struct LocalCacheOptions<T> {
    /// TTL applied on every write. `None` means entries never expire by TTL.
    pub ttl: Option<Ttl<T>>,
    /// Capacity bound enforced by cleanup passes.
    pub max_keys: Option<usize>,
    /// Policy used when the store exceeds `max_keys`.
    pub eviction: EvictionPolicy,
    /// Interval of the background sweep. `None` disables the sweep.
    pub check_period: Option<Duration>,
}

impl<T> LocalCacheOptions<T> {
    pub fn with_ttl(mut self, ttl: impl Into<Ttl<T>>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn with_check_period(mut self, period: Duration) -> Self {
        self.check_period = Some(period);
        self
    }
}

impl<T> Default for LocalCacheOptions<T> {
    fn default() -> Self {
        Self {
            ttl: None,
            max_keys: None,
            eviction: EvictionPolicy::default(),
            check_period: None,
        }
    }
}

impl<T> Clone for LocalCacheOptions<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl.clone(),
            max_keys: self.max_keys,
            eviction: self.eviction,
            check_period: self.check_period,
        }
    }
}

impl<T> fmt::Debug for LocalCacheOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCacheOptions")
            .field("ttl", &self.ttl)
            .field("max_keys", &self.max_keys)
            .field("eviction", &self.eviction)
            .field("check_period", &self.check_period)
            .finish()
    }
}

/// Local tier statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct LocalCacheStats {
    /// Number of entries currently in the store.
    pub size: usize,
    /// Number of read hits.
    pub hits: u64,
    /// Number of read misses (absent or expired).
    pub misses: u64,
    /// Number of entries removed because their TTL elapsed.
    pub expired: u64,
    /// Number of entries removed to respect `max_keys`.
    pub evicted: u64,
}

impl LocalCacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Inner<T> {
    store: Mutex<Snapshot<T>>,
    options: LocalCacheOptions<T>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evicted: AtomicU64,
}

impl<T> Inner<T> {
    fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.lock();

        let before = store.len();
        store.retain(|_, entry| !entry.is_stale_at(now));
        let expired = before - store.len();

        let mut evicted = 0;
        if let Some(max_keys) = self.options.max_keys {
            if store.len() > max_keys {
                let count = store.len() - max_keys;
                let victims: HashSet<String> =
                    self.options.eviction.select(&store, count).into_iter().collect();
                // One pass keeps the survivors in order.
                store.retain(|id, _| !victims.contains(id));
                evicted = victims.len();
            }
        }

        let size = store.len();
        drop(store);

        if expired + evicted > 0 {
            self.expired.fetch_add(expired as u64, Ordering::Relaxed);
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            metrics::record_evictions("expired", expired);
            metrics::record_evictions("capacity", evicted);
            tracing::debug!(
                expired,
                evicted,
                remaining = size,
                policy = %self.options.eviction,
                "local cache cleanup"
            );
        }
        metrics::set_cache_entries(metrics::tier::LOCAL, size);

        expired + evicted
    }
}

/// In-process cache tier with TTL and bounded size.
///
/// Cheap operations (`get`, `del`, `ttl`, `cleanup`) run synchronously under
/// a short lock and never suspend. `set` only suspends while a per-value TTL
/// function is computed; the entry is committed afterwards in one step.
pub struct LocalCache<T> {
    inner: Arc<Inner<T>>,
    id_fn: IdFn<T>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<T> LocalCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a local cache.
    ///
    /// When `check_period` is set, the periodic sweep starts immediately if a
    /// Tokio runtime is available.
    pub fn new(id_fn: IdFn<T>, options: LocalCacheOptions<T>) -> Self {
        let check_period = options.check_period;
        let cache = Self {
            inner: Arc::new(Inner {
                store: Mutex::new(IndexMap::new()),
                options,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                expired: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
            }),
            id_fn,
            sweeper: Mutex::new(None),
        };
        if check_period.is_some() {
            cache.start_interval_check();
        }
        cache
    }

    /// Options this cache was built with.
    pub fn options(&self) -> &LocalCacheOptions<T> {
        &self.inner.options
    }

    /// Get a value, refreshing its last-used instant.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, id: &str) -> Option<T> {
        let now = Instant::now();
        let mut store = self.inner.store.lock();

        let expired = match store.get_mut(id) {
            None => false,
            Some(entry) if entry.is_expired_at(now) => true,
            Some(entry) => {
                entry.last_used = Some(now);
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.data.clone());
            }
        };

        if expired {
            store.shift_remove(id);
            self.inner.expired.fetch_add(1, Ordering::Relaxed);
            metrics::record_evictions("expired", 1);
            tracing::debug!(id = %id, "local entry expired on read");
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value under `id`, replacing any existing entry.
    pub async fn set(&self, id: impl Into<String>, data: T) {
        let id = id.into();
        let ttl = match &self.inner.options.ttl {
            Some(ttl) => ttl.resolve(&data).await,
            None => None,
        };

        let now = Instant::now();
        let entry = Entry {
            data,
            expire_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            last_used: Some(now),
        };
        self.inner.store.lock().insert(id, entry);
    }

    /// Store a value under the id derived from it.
    pub async fn set_record(&self, data: T) {
        let id = (self.id_fn)(&data);
        self.set(id, data).await;
    }

    /// Remove an entry. Removing an absent id is a no-op.
    pub fn del(&self, id: &str) {
        self.inner.store.lock().shift_remove(id);
    }

    /// Remaining time before `id` expires.
    ///
    /// `None` if the entry is absent, has no expiry, or has already expired.
    /// This is a read-only probe: it neither deletes expired entries nor
    /// refreshes the last-used instant.
    pub fn ttl(&self, id: &str) -> Option<Duration> {
        let store = self.inner.store.lock();
        let expire_at = store.get(id)?.expire_at?;
        expire_at.checked_duration_since(Instant::now())
    }

    /// Force the expiry of an existing entry to `now + ttl`.
    ///
    /// Returns `ttl`, or `None` without creating anything if `id` is absent.
    /// A `ttl` past the clock's range leaves the entry without expiry.
    pub fn set_ttl(&self, id: &str, ttl: Duration) -> Option<Duration> {
        let mut store = self.inner.store.lock();
        let entry = store.get_mut(id)?;
        entry.expire_at = Instant::now().checked_add(ttl);
        Some(ttl)
    }

    /// Every surviving `(id, data)` pair in store order, after a cleanup pass.
    pub fn all(&self) -> Vec<(String, T)> {
        self.cleanup();
        self.inner
            .store
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.data.clone()))
            .collect()
    }

    /// Remove expired entries, then trim to `max_keys` by policy.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        self.inner.cleanup()
    }

    /// Replace the whole store, then run a cleanup pass.
    pub fn restore(&self, snapshot: Snapshot<T>) {
        *self.inner.store.lock() = snapshot;
        self.cleanup();
    }

    /// Copy of the whole store, suitable for [`LocalCache::restore`].
    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.store.lock().clone()
    }

    /// Raw entry for `id`, without expiry checks or last-used refresh.
    pub fn entry(&self, id: &str) -> Option<Entry<T>> {
        self.inner.store.lock().get(id).cloned()
    }

    /// Whether an entry exists for `id`, expired or not.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.store.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().is_empty()
    }

    /// Clear the whole store.
    pub fn flush(&self) {
        self.inner.store.lock().clear();
    }

    /// Start the periodic sweep, replacing any running one.
    ///
    /// Does nothing when no `check_period` is configured, when the period is
    /// zero, or when called outside a Tokio runtime.
    pub fn start_interval_check(&self) {
        let mut sweeper = self.sweeper.lock();
        if let Some(handle) = sweeper.take() {
            handle.abort();
            tracing::info!("local cache sweep stopped");
        }

        let Some(period) = self.inner.options.check_period else {
            return;
        };
        if period.is_zero() {
            tracing::warn!("local cache check period is zero, sweep not started");
            return;
        }
        let Some(first_tick) = Instant::now().checked_add(period) else {
            tracing::warn!(?period, "local cache check period out of range, sweep not started");
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("no Tokio runtime, local cache sweep not started");
                return;
            }
        };

        let inner = Arc::downgrade(&self.inner);
        *sweeper = Some(runtime.spawn(sweep(inner, first_tick, period)));
        tracing::info!(period_ms = period.as_millis() as u64, "local cache sweep started");
    }

    /// Stop the periodic sweep if it is running.
    pub fn stop_interval_check(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            tracing::info!("local cache sweep stopped");
        }
    }

    /// Whether the periodic sweep is running.
    pub fn is_interval_check_running(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the periodic sweep. Idempotent.
    pub fn close(&self) {
        self.stop_interval_check();
    }

    pub fn stats(&self) -> LocalCacheStats {
        LocalCacheStats {
            size: self.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            expired: self.inner.expired.load(Ordering::Relaxed),
            evicted: self.inner.evicted.load(Ordering::Relaxed),
        }
    }
}

impl<T> Drop for LocalCache<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

async fn sweep<T>(inner: Weak<Inner<T>>, first_tick: Instant, period: Duration) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(strong) = inner.upgrade() else {
            break;
        };
        strong.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: String,
    }

    fn item(id: &str, value: &str) -> Item {
        Item {
            id: id.to_string(),
            value: value.to_string(),
        }
    }

    fn cache(options: LocalCacheOptions<Item>) -> LocalCache<Item> {
        LocalCache::new(Arc::new(|item: &Item| item.id.clone()), options)
    }

    fn snapshot(entries: Vec<(&str, Entry<Item>)>) -> Snapshot<Item> {
        entries
            .into_iter()
            .map(|(id, entry)| (id.to_string(), entry))
            .collect()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = cache(LocalCacheOptions::default());
        cache.set("1", item("1", "one")).await;

        assert_eq!(cache.get("1"), Some(item("1", "one")));
        assert_eq!(cache.get("2"), None);

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_set_record_derives_id() {
        let cache = cache(LocalCacheOptions::default());
        cache.set_record(item("42", "answer")).await;

        assert_eq!(cache.get("42"), Some(item("42", "answer")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_on_read() {
        let cache = cache(LocalCacheOptions::default().with_ttl(Duration::from_millis(8)));
        cache.set("5", item("5", "local")).await;
        assert!(cache.get("5").is_some());

        tokio::time::advance(Duration::from_millis(8)).await;

        assert!(cache.contains("5"));
        assert_eq!(cache.get("5"), None);
        assert!(!cache.contains("5"));
        assert_eq!(cache.stats().expired, 1);
    }

    #[tokio::test]
    async fn test_entry_without_ttl_never_expires() {
        let cache = cache(LocalCacheOptions::default());
        cache.set("1", item("1", "one")).await;

        let entry = cache.entry("1").unwrap();
        assert_eq!(entry.expire_at, None);
        assert!(entry.last_used.is_some());
        assert_eq!(cache.ttl("1"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_value_ttl() {
        let options = LocalCacheOptions::default().with_ttl(Ttl::per_value(|item: &Item| {
            (item.value == "short").then(|| Duration::from_millis(10))
        }));
        let cache = cache(options);

        cache.set("a", item("a", "short")).await;
        cache.set("b", item("b", "long")).await;

        assert_eq!(cache.ttl("a"), Some(Duration::from_millis(10)));
        assert_eq!(cache.ttl("b"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_accessor() {
        let cache = cache(LocalCacheOptions::default());
        cache.set("14", item("14", "ttl14")).await;
        assert_eq!(cache.ttl("14"), None);

        assert_eq!(cache.set_ttl("14", Duration::from_millis(4)), Some(Duration::from_millis(4)));
        let remaining = cache.ttl("14").unwrap();
        assert!(remaining > Duration::ZERO && remaining <= Duration::from_millis(4));
        assert_eq!(cache.get("14"), Some(item("14", "ttl14")));

        tokio::time::advance(Duration::from_millis(5)).await;
        assert_eq!(cache.ttl("14"), None);
        assert!(cache.contains("14"));
        assert_eq!(cache.get("14"), None);
    }

    #[tokio::test]
    async fn test_ttl_past_clock_range_means_no_expiry() {
        let cache = cache(LocalCacheOptions::default().with_ttl(Duration::MAX));
        cache.set("1", item("1", "forever")).await;

        assert_eq!(cache.entry("1").unwrap().expire_at, None);
        assert_eq!(cache.get("1"), Some(item("1", "forever")));

        cache.set_ttl("1", Duration::from_secs(1));
        assert!(cache.ttl("1").is_some());
        assert_eq!(cache.set_ttl("1", Duration::MAX), Some(Duration::MAX));
        assert_eq!(cache.ttl("1"), None);
        assert_eq!(cache.get("1"), Some(item("1", "forever")));

        assert_eq!(Entry::new(0u8).with_ttl(Duration::MAX).expire_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_ttl_is_awaited_before_commit() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let ttl_gate = Arc::clone(&gate);
        let options = LocalCacheOptions::default().with_ttl(Ttl::per_value_async(
            move |_: &Item| {
                let gate = Arc::clone(&ttl_gate);
                async move {
                    gate.notified().await;
                    Some(Duration::from_secs(1))
                }
            },
        ));
        let cache = Arc::new(cache(options));

        let writer = Arc::clone(&cache);
        let write = tokio::spawn(async move { writer.set("1", item("1", "slow")).await });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!cache.contains("1"));

        gate.notify_one();
        write.await.unwrap();
        assert_eq!(cache.ttl("1"), Some(Duration::from_secs(1)));
        assert_eq!(cache.get("1"), Some(item("1", "slow")));
    }

    #[tokio::test]
    async fn test_set_ttl_on_absent_id() {
        let cache = cache(LocalCacheOptions::default());
        assert_eq!(cache.set_ttl("missing", Duration::from_secs(1)), None);
        assert!(!cache.contains("missing"));
    }

    #[tokio::test]
    async fn test_del_is_idempotent() {
        let cache = cache(LocalCacheOptions::default());
        cache.set("31", item("31", "3131")).await;

        cache.del("31");
        cache.del("31");
        assert_eq!(cache.get("31"), None);
    }

    #[tokio::test]
    async fn test_reset_keeps_insertion_position() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_max_keys(2)
                .with_eviction(EvictionPolicy::First),
        );
        cache.set("1", item("1", "111")).await;
        cache.set("2", item("2", "222")).await;
        cache.set("3", item("3", "333")).await;
        cache.set("1", item("1", "updated")).await;

        assert_eq!(cache.cleanup(), 1);
        assert!(!cache.contains("1"));
        assert!(cache.contains("2"));
        assert!(cache.contains("3"));
    }

    #[tokio::test]
    async fn test_large_capacity_pass_keeps_store_order() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_max_keys(5_000)
                .with_eviction(EvictionPolicy::First),
        );
        for i in 0..10_000 {
            let id = i.to_string();
            cache.set(id.clone(), item(&id, "v")).await;
        }

        assert_eq!(cache.cleanup(), 5_000);
        assert_eq!(cache.stats().evicted, 5_000);
        let ids: Vec<String> = cache.snapshot().into_keys().collect();
        let expected: Vec<String> = (5_000..10_000).map(|i: i32| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_capacity_first() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_max_keys(2)
                .with_eviction(EvictionPolicy::First),
        );
        cache.set("1", item("1", "111")).await;
        cache.set("2", item("2", "222")).await;
        cache.set("3", item("3", "333")).await;

        // Reads do not change insertion order.
        cache.get("1");
        cache.get("2");

        assert_eq!(cache.cleanup(), 1);
        assert!(!cache.contains("1"));
        assert_eq!(cache.entry("2").unwrap().data.value, "222");
        assert_eq!(cache.entry("3").unwrap().data.value, "333");
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_oldest_used() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_max_keys(2)
                .with_eviction(EvictionPolicy::OldestUsed),
        );
        cache.set("1", item("1", "111")).await;
        cache.set("2", item("2", "222")).await;
        cache.set("3", item("3", "333")).await;

        tokio::time::advance(Duration::from_millis(1)).await;
        cache.get("1");
        cache.get("2");

        cache.cleanup();
        assert!(cache.contains("1"));
        assert!(cache.contains("2"));
        assert!(!cache.contains("3"));
        assert_eq!(cache.stats().evicted, 1);
    }

    #[tokio::test]
    async fn test_restore_oldest_used() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_max_keys(2)
                .with_eviction(EvictionPolicy::OldestUsed),
        );
        let base = Instant::now();
        cache.restore(snapshot(vec![
            ("1", Entry::new(item("1", "111")).last_used_at(base + Duration::from_millis(9))),
            ("2", Entry::new(item("2", "222")).last_used_at(base + Duration::from_millis(1))),
            ("3", Entry::new(item("3", "333")).last_used_at(base + Duration::from_millis(10))),
        ]));

        assert!(cache.contains("1"));
        assert!(!cache.contains("2"));
        assert!(cache.contains("3"));
    }

    #[tokio::test]
    async fn test_restore_closest_expiry() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_max_keys(2)
                .with_eviction(EvictionPolicy::ClosestExpiry),
        );
        let now = Instant::now();
        cache.restore(snapshot(vec![
            ("1", Entry::new(item("1", "111")).expires_at(now + Duration::from_millis(500))),
            ("2", Entry::new(item("2", "222")).expires_at(now + Duration::from_millis(100))),
            ("3", Entry::new(item("3", "333")).expires_at(now + Duration::from_millis(600))),
        ]));

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("1"));
        assert!(!cache.contains("2"));
        assert!(cache.contains("3"));
    }

    #[tokio::test]
    async fn test_capacity_keeps_entries_without_expiry() {
        let cache = cache(LocalCacheOptions::default().with_max_keys(1));
        let now = Instant::now();
        cache.restore(snapshot(vec![
            ("forever", Entry::new(item("forever", "f"))),
            ("soon", Entry::new(item("soon", "s")).expires_at(now + Duration::from_secs(60))),
        ]));

        assert!(cache.contains("forever"));
        assert!(!cache.contains("soon"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_expired_regardless_of_capacity() {
        let cache = cache(LocalCacheOptions::default());
        let now = Instant::now();
        cache.restore(snapshot(vec![
            ("5", Entry::new(item("5", "local")).expires_at(now + Duration::from_millis(2))),
            ("6", Entry::new(item("6", "kept"))),
        ]));
        assert!(cache.get("5").is_some());

        tokio::time::advance(Duration::from_millis(4)).await;
        assert_eq!(cache.cleanup(), 1);
        assert!(!cache.contains("5"));
        assert!(cache.contains("6"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_do_not_count_against_capacity() {
        let cache = cache(LocalCacheOptions::default().with_max_keys(2));
        let created = Instant::now();
        tokio::time::advance(Duration::from_millis(1)).await;

        cache.restore(snapshot(vec![
            ("old", Entry::new(item("old", "o")).expires_at(created)),
            ("a", Entry::new(item("a", "a"))),
            ("b", Entry::new(item("b", "b"))),
        ]));

        assert!(!cache.contains("old"));
        assert!(cache.contains("a"));
        assert!(cache.contains("b"));
        let stats = cache.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.evicted, 0);
    }

    #[tokio::test]
    async fn test_restore_without_last_used() {
        let cache = cache(LocalCacheOptions::default());
        cache.restore(snapshot(vec![("1", Entry::new(item("1", "11")))]));

        assert_eq!(cache.entry("1").unwrap().last_used, None);
        assert_eq!(cache.get("1"), Some(item("1", "11")));
        assert!(cache.entry("1").unwrap().last_used.is_some());
    }

    #[tokio::test]
    async fn test_all_returns_store_order() {
        let cache = cache(LocalCacheOptions::default());
        cache.set_record(item("5", "555")).await;
        cache.set_record(item("8", "888")).await;

        let all = cache.all();
        assert_eq!(
            all,
            vec![
                ("5".to_string(), item("5", "555")),
                ("8".to_string(), item("8", "888")),
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_restore() {
        let source = cache(LocalCacheOptions::default());
        source.set("1", item("1", "one")).await;
        source.set("2", item("2", "two")).await;

        let target = cache(LocalCacheOptions::default());
        target.restore(source.snapshot());
        assert_eq!(target.all(), source.all());
    }

    #[tokio::test]
    async fn test_flush() {
        let cache = cache(LocalCacheOptions::default());
        for i in 0..5 {
            cache.set(i.to_string(), item(&i.to_string(), "v")).await;
        }
        assert_eq!(cache.len(), 5);

        cache.flush();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_ttl(Duration::from_millis(10))
                .with_check_period(Duration::from_millis(50)),
        );
        assert!(cache.is_interval_check_running());

        cache.set("1", item("1", "one")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!cache.contains("1"));
        assert_eq!(cache.stats().expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_sweep() {
        let cache = cache(
            LocalCacheOptions::default()
                .with_ttl(Duration::from_millis(10))
                .with_check_period(Duration::from_millis(50)),
        );
        cache.close();
        cache.close();
        assert!(!cache.is_interval_check_running());

        cache.set("1", item("1", "one")).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.contains("1"));

        cache.start_interval_check();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!cache.contains("1"));
    }

    #[tokio::test]
    async fn test_zero_check_period_does_not_start_sweep() {
        let cache = cache(LocalCacheOptions::default().with_check_period(Duration::ZERO));
        assert!(!cache.is_interval_check_running());

        cache.start_interval_check();
        assert!(!cache.is_interval_check_running());
    }

    #[tokio::test]
    async fn test_restart_replaces_running_sweep() {
        let cache = cache(LocalCacheOptions::default().with_check_period(Duration::from_millis(5)));
        assert!(cache.is_interval_check_running());

        cache.start_interval_check();
        cache.start_interval_check();
        assert!(cache.is_interval_check_running());

        cache.stop_interval_check();
        assert!(!cache.is_interval_check_running());
    }

    #[test]
    fn test_sweep_needs_runtime() {
        let cache = cache(LocalCacheOptions::default().with_check_period(Duration::from_millis(5)));
        assert!(!cache.is_interval_check_running());
    }

    #[test]
    fn test_hit_rate_calculation() {
        let stats = LocalCacheStats {
            size: 10,
            hits: 75,
            misses: 25,
            expired: 0,
            evicted: 5,
        };
        assert!((stats.hit_rate() - 75.0).abs() < 0.001);
        assert!((LocalCacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }
}
