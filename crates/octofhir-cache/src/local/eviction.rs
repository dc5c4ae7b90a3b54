//! Capacity eviction policies for the local tier.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::entry::Entry;

/// Which entries to drop when the local tier holds more than `max_keys`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvictionPolicy {
    /// Earliest inserted entries first.
    First,
    /// Least recently read entries first. Entries never read go last.
    OldestUsed,
    /// Entries expiring soonest first. Entries without expiry go last.
    #[default]
    ClosestExpiry,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::First => "FIRST",
            EvictionPolicy::OldestUsed => "OLDEST_USED",
            EvictionPolicy::ClosestExpiry => "CLOSEST_EXPIRY",
        }
    }

    /// Pick `count` ids to evict from `store`.
    ///
    /// Sorting is stable, so ties keep store order. Entries whose sort key is
    /// absent sort after every present key.
    pub(crate) fn select<T>(
        &self,
        store: &IndexMap<String, Entry<T>>,
        count: usize,
    ) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(&String, &Entry<T>)> = store.iter().collect();
        match self {
            EvictionPolicy::First => {}
            EvictionPolicy::OldestUsed => {
                candidates.sort_by_key(|(_, entry)| (entry.last_used.is_none(), entry.last_used));
            }
            EvictionPolicy::ClosestExpiry => {
                candidates.sort_by_key(|(_, entry)| (entry.expire_at.is_none(), entry.expire_at));
            }
        }

        candidates
            .into_iter()
            .take(count)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIRST" => Ok(EvictionPolicy::First),
            "OLDEST_USED" => Ok(EvictionPolicy::OldestUsed),
            "CLOSEST_EXPIRY" => Ok(EvictionPolicy::ClosestExpiry),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}
