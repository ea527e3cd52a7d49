//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration, and capacity-pressure eviction. All operations are synchronous
//! map mutations; nothing in here ever awaits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::pattern::glob_match;
use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

use serde_json::Value;

// == Eviction Listener ==
/// Capability interface notified on every entry removal: explicit delete,
/// expiry, eviction, pattern delete, and clear. Callers use this for
/// cross-cache bookkeeping. The method is mandatory; adapters that don't care
/// use [`NoopEvictionListener`].
pub trait EvictionListener: Send + Sync {
    fn on_remove(&self, key: &str, entry: &CacheEntry);
}

/// Listener that ignores all removals. The default.
#[derive(Debug, Default)]
pub struct NoopEvictionListener;

impl EvictionListener for NoopEvictionListener {
    fn on_remove(&self, _key: &str, _entry: &CacheEntry) {}
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker, in lockstep with `entries`
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed (0 = unbounded)
    max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    /// Notified on every removal
    listener: Arc<dyn EvictionListener>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries (0 disables the cap)
    /// * `default_ttl` - Default TTL in seconds for entries without explicit TTL
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
            listener: Arc::new(NoopEvictionListener),
        }
    }

    /// Replaces the eviction listener.
    pub fn set_eviction_listener(&mut self, listener: Arc<dyn EvictionListener>) {
        self.listener = listener;
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit updates recency and access metadata and counts toward the hit
    /// rate. An expired entry is removed as a side effect and counts as a
    /// miss, as does an absent key. Misses are never errors.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let start = Instant::now();
        let result = self.get_inner(key);
        self.stats.record_access_time(start.elapsed());
        result
    }

    fn get_inner(&mut self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.set_total_entries(self.entries.len());
            self.stats.record_miss();
            return None;
        }

        let value = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch();
                entry.value.clone()
            }
            None => return None,
        };
        self.lru.touch(key);
        self.stats.record_hit();
        Some(value)
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists, the value is overwritten and the TTL clock
    /// restarts. If inserting a brand-new key would exceed capacity, the
    /// least recently used entry is evicted first.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&mut self, key: String, value: Value, ttl: Option<u64>) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let serialized_size = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(0);
        if serialized_size > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let is_overwrite = self.entries.contains_key(&key);

        // If not overwriting and at capacity, evict the LRU entry first
        if !is_overwrite && self.max_entries > 0 && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.lru.evict_oldest() {
                if let Some(entry) = self.entries.remove(&evicted_key) {
                    self.listener.on_remove(&evicted_key, &entry);
                }
                self.stats.record_eviction();
            }
        }

        let effective_ttl = Some(ttl.unwrap_or(self.default_ttl));
        let entry = CacheEntry::new(value, effective_ttl);
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether removal occurred.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Has ==
    /// Existence check honoring expiration.
    ///
    /// Does NOT update recency or access metadata; only `get` does. An entry
    /// found expired is still removed, since "exists" must honor expiry.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.set_total_entries(self.entries.len());
            return false;
        }

        true
    }

    // == Delete Pattern ==
    /// Removes all keys matching a `*`-wildcard glob pattern.
    ///
    /// Two-phase: collects matching keys first, then deletes, so the map is
    /// never mutated during traversal. Returns the number removed.
    pub fn delete_pattern(&mut self, pattern: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();

        let count = matching.len();
        for key in matching {
            self.remove_entry(&key);
        }

        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Clear ==
    /// Removes all entries, firing the listener for each, and resets counters.
    pub fn clear(&mut self) {
        for (key, entry) in self.entries.drain() {
            self.listener.on_remove(&key, &entry);
        }
        self.lru.clear();
        self.stats.reset();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Two-phase collect-then-delete; safe to interleave with normal traffic
    /// under the caller's lock. Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.remove_entry(&key);
        }

        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Evict LRU ==
    /// Evicts up to `n` least-recently-used entries under external pressure.
    ///
    /// Returns the number actually evicted. Each removal counts toward the
    /// eviction statistic.
    pub fn evict_lru(&mut self, n: usize) -> usize {
        let mut evicted = 0;
        for _ in 0..n {
            match self.lru.evict_oldest() {
                Some(key) => {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.listener.on_remove(&key, &entry);
                    }
                    self.stats.record_eviction();
                    evicted += 1;
                }
                None => break,
            }
        }

        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    // == Evict To Budget ==
    /// Byte-budget eviction: removes least-recently-used entries until the
    /// estimated memory footprint drops to `target_bytes` or the store is
    /// empty. Returns the number evicted.
    pub fn evict_to_budget(&mut self, target_bytes: usize) -> usize {
        let mut evicted = 0;
        while self.estimated_memory() > target_bytes {
            match self.lru.evict_oldest() {
                Some(key) => {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.listener.on_remove(&key, &entry);
                    }
                    self.stats.record_eviction();
                    evicted += 1;
                }
                None => break,
            }
        }

        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    // == Memory Estimation ==
    /// Estimated memory footprint of all entries, in bytes.
    pub fn estimated_memory(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, entry)| entry.estimated_size(key))
            .sum()
    }

    // == Stats ==
    /// Returns current cache statistics with entry count and memory estimate
    /// refreshed.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats.set_memory_usage(self.estimated_memory());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes one entry, notifying the listener. Returns whether it existed.
    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.lru.remove(key);
                self.listener.on_remove(key, &entry);
                true
            }
            None => false,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::thread::sleep;
    use std::time::Duration;

    /// Test listener that records removed keys.
    #[derive(Default)]
    struct RecordingListener {
        removed: Mutex<Vec<String>>,
    }

    impl EvictionListener for RecordingListener {
        fn on_remove(&self, key: &str, _entry: &CacheEntry) {
            self.removed.lock().unwrap().push(key.to_string());
        }
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, 300);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!("value1"), None).unwrap();
        let value = store.get("key1").unwrap();

        assert_eq!(value, json!("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_miss_is_none() {
        let mut store = CacheStore::new(100, 300);

        assert!(store.get("nonexistent").is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!(1), None).unwrap();
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!("v1"), Some(1)).unwrap();
        store.set("key1".to_string(), json!("v2"), Some(60)).unwrap();

        sleep(Duration::from_millis(1100));

        // Original 1s TTL was replaced on overwrite
        assert_eq!(store.get("key1"), Some(json!("v2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!(1), Some(1)).unwrap();
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert!(store.get("key1").is_none());
        // Lazy expiry removed the entry
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(3, 300);

        store.set("key1".to_string(), json!(1), None).unwrap();
        store.set("key2".to_string(), json!(2), None).unwrap();
        store.set("key3".to_string(), json!(3), None).unwrap();

        // Cache is full, adding key4 should evict key1 (oldest)
        store.set("key4".to_string(), json!(4), None).unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.get("key1").is_none());
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::new(3, 300);

        store.set("key1".to_string(), json!(1), None).unwrap();
        store.set("key2".to_string(), json!(2), None).unwrap();
        store.set("key3".to_string(), json!(3), None).unwrap();

        // Access key1 to make it most recently used
        store.get("key1").unwrap();

        // Adding key4 should evict key2 (now oldest)
        store.set("key4".to_string(), json!(4), None).unwrap();

        assert!(store.get("key1").is_some());
        assert!(store.get("key2").is_none());
    }

    #[test]
    fn test_store_has_does_not_touch_lru() {
        let mut store = CacheStore::new(2, 300);

        store.set("key1".to_string(), json!(1), None).unwrap();
        store.set("key2".to_string(), json!(2), None).unwrap();

        // has() must not refresh key1's recency
        assert!(store.has("key1"));

        store.set("key3".to_string(), json!(3), None).unwrap();

        // key1 was still the LRU entry and got evicted
        assert!(store.get("key1").is_none());
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_store_has_honors_expiry() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!(1), Some(1)).unwrap();
        assert!(store.has("key1"));

        sleep(Duration::from_millis(1100));

        assert!(!store.has("key1"));
        assert_eq!(store.len(), 0);
        // has() counts neither hits nor misses
        assert_eq!(store.stats().hits, 0);
        assert_eq!(store.stats().misses, 0);
    }

    #[test]
    fn test_store_delete_pattern() {
        let mut store = CacheStore::new(100, 300);

        store.set("user:1".to_string(), json!(1), None).unwrap();
        store.set("user:2".to_string(), json!(2), None).unwrap();
        store.set("property:1".to_string(), json!(3), None).unwrap();

        let removed = store.delete_pattern("user:*");

        assert_eq!(removed, 2);
        assert!(store.get("user:1").is_none());
        assert!(store.get("user:2").is_none());
        assert!(store.get("property:1").is_some());
    }

    #[test]
    fn test_store_clear_resets_counters() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!(1), None).unwrap();
        store.get("key1");
        store.get("missing");
        store.clear();

        assert!(store.is_empty());
        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new(100, 300);

        store.set("key1".to_string(), json!(1), Some(1)).unwrap();
        store.set("key2".to_string(), json!(2), Some(10)).unwrap();

        sleep(Duration::from_millis(1100));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_store_evict_lru_count() {
        let mut store = CacheStore::new(100, 300);

        for i in 0..5 {
            store.set(format!("key{}", i), json!(i), None).unwrap();
        }

        let evicted = store.evict_lru(2);
        assert_eq!(evicted, 2);
        assert_eq!(store.len(), 3);
        // Oldest two went first
        assert!(store.get("key0").is_none());
        assert!(store.get("key1").is_none());
        assert!(store.get("key2").is_some());

        // Asking for more than present evicts what exists
        let evicted = store.evict_lru(10);
        assert_eq!(evicted, 3);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_evict_to_budget() {
        let mut store = CacheStore::new(100, 300);

        for i in 0..10 {
            store.set(format!("key{}", i), json!("x"), None).unwrap();
        }

        let before = store.estimated_memory();
        let evicted = store.evict_to_budget(before / 2);

        assert!(evicted > 0);
        assert!(store.estimated_memory() <= before / 2);

        // Zero budget empties the store
        store.evict_to_budget(0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_eviction_listener_fires() {
        let listener = Arc::new(RecordingListener::default());
        let mut store = CacheStore::new(2, 300);
        store.set_eviction_listener(listener.clone());

        store.set("a".to_string(), json!(1), None).unwrap();
        store.set("b".to_string(), json!(2), None).unwrap();
        store.set("c".to_string(), json!(3), None).unwrap(); // evicts a
        store.delete("b"); // explicit delete
        store.clear(); // removes c

        let removed = listener.removed.lock().unwrap().clone();
        assert_eq!(removed, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_store_key_too_long() {
        let mut store = CacheStore::new(100, 300);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.set(long_key, json!(1), None);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_value_too_large() {
        let mut store = CacheStore::new(100, 300);
        let large_value = json!("x".repeat(MAX_VALUE_SIZE + 1));

        let result = store.set("key".to_string(), large_value, None);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_unbounded_when_max_entries_zero() {
        let mut store = CacheStore::new(0, 300);

        for i in 0..50 {
            store.set(format!("key{}", i), json!(i), None).unwrap();
        }

        assert_eq!(store.len(), 50);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_memory_estimate_nonzero() {
        let mut store = CacheStore::new(100, 300);
        store.set("key1".to_string(), json!({"a": 1}), None).unwrap();

        let stats = store.stats();
        assert!(stats.memory_usage > 80);
        assert_eq!(stats.total_entries, 1);
    }
}
