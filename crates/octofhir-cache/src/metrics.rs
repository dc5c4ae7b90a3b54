//! Cache metrics recorded through the `metrics` facade.
//!
//! The crate never installs a recorder; whatever exporter the host process
//! installs (e.g. Prometheus) picks these up.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_EVICTIONS_TOTAL: &str = "cache_evictions_total";
    pub const CACHE_ENTRIES: &str = "cache_entries";
}

/// Tier labels.
pub mod tier {
    pub const LOCAL: &str = "local";
    pub const REMOTE: &str = "remote";
    pub const PERSISTENT: &str = "persistent";
}

/// Record a cache hit.
pub fn record_cache_hit(tier: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
}

/// Record a read that no tier could answer.
pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Record entries removed from the local tier.
pub fn record_evictions(reason: &'static str, count: usize) {
    if count == 0 {
        return;
    }
    counter!(names::CACHE_EVICTIONS_TOTAL, "reason" => reason).increment(count as u64);
}

/// Set the number of cache entries.
pub fn set_cache_entries(tier: &'static str, count: usize) {
    gauge!(names::CACHE_ENTRIES, "tier" => tier).set(count as f64);
}
