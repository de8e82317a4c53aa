//! Short-lived result cache keyed by the canonical request serialization.
//!
//! Process-wide and read-mostly: entries are replaced, never mutated, and
//! staleness is checked lazily at read time (no background sweep). Upstream
//! writes are not observed; staleness up to the TTL is accepted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::catalog::walker::Aggregation;
use crate::util::env::env_parse;

const DEFAULT_TTL_SECS: u64 = 60;

struct CacheEntry {
    payload: Arc<Aggregation>,
    created_at: Instant,
}

pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Duration::from_secs(env_parse(
            "CATALOG_CACHE_TTL_SECS",
            DEFAULT_TTL_SECS,
        )))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh payload for `key`, or `None` on miss/expiry. Expired entries are
    /// left in place and overwritten by the next successful `put`.
    pub fn get(&self, key: &str) -> Option<Arc<Aggregation>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Arc<Aggregation>> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        if now.duration_since(entry.created_at) > self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.payload))
    }

    /// Insert or replace. Concurrent writers to the same key race benignly;
    /// last writer wins.
    pub fn put(&self, key: String, payload: Arc<Aggregation>) {
        self.put_at(key, payload, Instant::now());
    }

    fn put_at(&self, key: String, payload: Arc<Aggregation>, created_at: Instant) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key,
            CacheEntry {
                payload,
                created_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: usize) -> Arc<Aggregation> {
        Arc::new(Aggregation {
            records: Vec::new(),
            pages_fetched: n as u32,
            truncated: false,
        })
    }

    #[test]
    fn entry_is_fresh_just_under_ttl_and_stale_just_over() {
        let cache = ResultCache::new(Duration::from_secs(60));
        let created = Instant::now();
        cache.put_at("k".into(), payload(1), created);

        let just_under = created + Duration::from_secs(60) - Duration::from_millis(1);
        assert!(cache.get_at("k", just_under).is_some());

        let just_over = created + Duration::from_secs(60) + Duration::from_millis(1);
        assert!(cache.get_at("k", just_over).is_none());
    }

    #[test]
    fn missing_key_is_a_miss() {
        let cache = ResultCache::new(Duration::from_secs(60));
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn put_replaces_and_last_writer_wins() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("k".into(), payload(1));
        cache.put("k".into(), payload(2));
        assert_eq!(cache.get("k").unwrap().pages_fetched, 2);
    }

    #[test]
    fn distinct_keys_do_not_interfere() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("a".into(), payload(1));
        cache.put("b".into(), payload(2));
        assert_eq!(cache.get("a").unwrap().pages_fetched, 1);
        assert_eq!(cache.get("b").unwrap().pages_fetched, 2);
    }
}
