//! Cache Service Module
//!
//! Async facade over a [`CacheStore`]: typed get/set, single-flight
//! get-or-fetch with stampede protection, pattern invalidation, and metrics
//! and health snapshots. This is the one composition point where breaker
//! gating and latency instrumentation are applied; there are no per-concern
//! wrapper layers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};

use crate::breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker};
use crate::cache::store::EvictionListener;
use crate::cache::{CacheStats, CacheStore};
use crate::error::{CacheError, Result};
use crate::metrics::{CacheMetrics, MetricsRecorder};

// == Cache Config ==
/// Per-instance cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (0 = unbounded)
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL (0 = never expire)
    pub default_ttl: u64,
    /// Namespace prefix transparently applied to all keys
    pub key_prefix: String,
    /// Toggles latency sampling overhead
    pub enable_metrics: bool,
    /// Optional circuit breaker gating loader factories
    pub breaker: Option<BreakerConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 300,
            key_prefix: String::new(),
            enable_metrics: true,
            breaker: None,
        }
    }
}

/// Shareable outcome of an in-flight load. Errors travel as strings because
/// they fan out to every awaiter.
#[derive(Debug, Clone)]
enum LoadError {
    CircuitOpen(String),
    Failed(String),
}

type LoadOutcome = std::result::Result<Value, LoadError>;

// == Health ==
/// Overall condition of one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health snapshot for one cache instance.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: HealthStatus,
    pub entries: usize,
    pub memory_usage: usize,
    pub hit_rate: f64,
    /// Present when a circuit breaker is configured
    pub breaker: Option<BreakerState>,
    /// ISO 8601 snapshot time
    pub timestamp: String,
}

struct CacheInner {
    name: String,
    key_prefix: String,
    store: RwLock<CacheStore>,
    /// In-flight loads by full key; an entry lives only for the duration of
    /// one factory call
    pending: Mutex<HashMap<String, broadcast::Sender<LoadOutcome>>>,
    breaker: Option<CircuitBreaker>,
    recorder: MetricsRecorder,
    enable_metrics: bool,
}

// == Cache ==
/// A named, thread-safe cache instance. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("name", &self.inner.name).finish()
    }
}

impl Cache {
    // == Constructor ==
    /// Creates a named cache instance.
    ///
    /// # Arguments
    /// * `name` - Instance name, used by the metrics collector and coordinator
    /// * `config` - Per-instance tuning
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        let store = CacheStore::new(config.max_entries, config.default_ttl);
        Self {
            inner: Arc::new(CacheInner {
                name: name.into(),
                key_prefix: config.key_prefix,
                store: RwLock::new(store),
                pending: Mutex::new(HashMap::new()),
                breaker: config.breaker.map(CircuitBreaker::new),
                recorder: MetricsRecorder::new(),
                enable_metrics: config.enable_metrics,
            }),
        }
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The configured circuit breaker, if any.
    pub fn breaker(&self) -> Option<&CircuitBreaker> {
        self.inner.breaker.as_ref()
    }

    /// Replaces the store's eviction listener.
    pub async fn set_eviction_listener(&self, listener: Arc<dyn EvictionListener>) {
        self.inner.store.write().await.set_eviction_listener(listener);
    }

    // == Get ==
    /// Retrieves and deserializes a value. `None` on miss or expiry; misses
    /// are never errors.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let start = Instant::now();
        let raw = {
            let mut store = self.inner.store.write().await;
            store.get(&self.prefixed(key))
        };

        let result = match raw {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::Internal(format!("deserialize {}: {}", key, e))),
            None => Ok(None),
        };

        self.record(start, result.is_err());
        result
    }

    /// Retrieves the raw JSON value without deserializing.
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        let start = Instant::now();
        let raw = {
            let mut store = self.inner.store.write().await;
            store.get(&self.prefixed(key))
        };
        self.record(start, false);
        raw
    }

    // == Set ==
    /// Serializes and stores a value with optional TTL in seconds.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<u64>) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::InvalidRequest(format!("serialize {}: {}", key, e)))?;
        self.set_raw(key, value, ttl).await
    }

    /// Stores a raw JSON value with optional TTL in seconds.
    pub async fn set_raw(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        let start = Instant::now();
        let result = {
            let mut store = self.inner.store.write().await;
            store.set(self.prefixed(key), value, ttl)
        };
        self.record(start, result.is_err());
        result
    }

    // == Delete ==
    /// Removes an entry. Returns whether removal occurred.
    pub async fn del(&self, key: &str) -> bool {
        let start = Instant::now();
        let removed = {
            let mut store = self.inner.store.write().await;
            store.delete(&self.prefixed(key))
        };
        self.record(start, false);
        removed
    }

    // == Has ==
    /// Existence check honoring expiration. Does not refresh recency.
    pub async fn has(&self, key: &str) -> bool {
        let start = Instant::now();
        let present = {
            let mut store = self.inner.store.write().await;
            store.has(&self.prefixed(key))
        };
        self.record(start, false);
        present
    }

    // == Clear ==
    /// Removes all entries and resets counters.
    pub async fn clear(&self) {
        let start = Instant::now();
        self.inner.store.write().await.clear();
        self.record(start, false);
    }

    // == Delete Pattern ==
    /// Removes all keys matching a `*`-wildcard glob. Returns count removed.
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        let start = Instant::now();
        let removed = {
            let mut store = self.inner.store.write().await;
            store.delete_pattern(&self.prefixed(pattern))
        };
        self.record(start, false);
        if removed > 0 {
            debug!(cache = %self.inner.name, pattern, removed, "pattern invalidation");
        }
        removed
    }

    // == Cleanup ==
    /// Sweeps expired entries. Returns count removed.
    pub async fn cleanup(&self) -> usize {
        let mut store = self.inner.store.write().await;
        store.cleanup_expired()
    }

    // == Get Or Fetch ==
    /// Returns the cached value, or loads it through `factory` with
    /// single-flight coalescing: for any number of concurrent callers of one
    /// absent key, the factory runs at most once and every caller observes
    /// the same outcome.
    ///
    /// A factory failure is propagated to all awaiters and clears the
    /// in-flight registration, so the next call retries fresh. When a circuit
    /// breaker is configured the factory call is gated through it.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, factory: F, ttl: Option<u64>) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let start = Instant::now();
        let result = self.get_or_fetch_inner(key, factory, ttl).await;
        self.record(start, result.is_err());
        result
    }

    async fn get_or_fetch_inner<T, F, Fut>(
        &self,
        key: &str,
        factory: F,
        ttl: Option<u64>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let full_key = self.prefixed(key);

        // Fast path: cache hit, factory never invoked
        if let Some(value) = self.inner.store.write().await.get(&full_key) {
            return serde_json::from_value(value)
                .map_err(|e| CacheError::Internal(format!("deserialize {}: {}", key, e)));
        }

        // Join an in-flight load, or register as the loader
        let subscription = {
            let mut pending = self.inner.pending.lock().await;
            match pending.get(&full_key) {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    // Double-check under the registry lock: a just-finished
                    // load may have populated the store after our miss
                    if let Some(value) = self.inner.store.write().await.get(&full_key) {
                        return serde_json::from_value(value).map_err(|e| {
                            CacheError::Internal(format!("deserialize {}: {}", key, e))
                        });
                    }
                    let (sender, _) = broadcast::channel(1);
                    pending.insert(full_key.clone(), sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = subscription {
            // Another caller's load is in flight; await the shared outcome
            return match receiver.recv().await {
                Ok(Ok(value)) => serde_json::from_value(value)
                    .map_err(|e| CacheError::Internal(format!("deserialize {}: {}", key, e))),
                Ok(Err(LoadError::CircuitOpen(msg))) => Err(CacheError::CircuitOpen(msg)),
                Ok(Err(LoadError::Failed(msg))) => Err(CacheError::Loader(msg)),
                Err(_) => Err(CacheError::Internal(format!(
                    "in-flight load for {} dropped without result",
                    key
                ))),
            };
        }

        // This caller is the loader
        let loaded: std::result::Result<T, LoadError> = match &self.inner.breaker {
            Some(breaker) => match breaker.execute(factory).await {
                Ok(value) => Ok(value),
                Err(BreakerError::Open { retry_after }) => Err(LoadError::CircuitOpen(format!(
                    "load for {} refused, retry in {:?}",
                    key, retry_after
                ))),
                Err(BreakerError::Inner(err)) => Err(LoadError::Failed(format!("{:#}", err))),
            },
            None => factory().await.map_err(|err| LoadError::Failed(format!("{:#}", err))),
        };

        match loaded {
            Ok(value) => {
                let raw = match serde_json::to_value(&value) {
                    Ok(raw) => raw,
                    Err(e) => {
                        self.finish_load(&full_key, Err(LoadError::Failed(e.to_string())))
                            .await;
                        return Err(CacheError::Internal(format!("serialize {}: {}", key, e)));
                    }
                };

                // A store refusal (oversized value) must not fail the load;
                // the caller still gets the freshly loaded value
                if let Err(e) = self
                    .inner
                    .store
                    .write()
                    .await
                    .set(full_key.clone(), raw.clone(), ttl)
                {
                    warn!(cache = %self.inner.name, key, error = %e, "store refused loaded value");
                }

                self.finish_load(&full_key, Ok(raw)).await;
                Ok(value)
            }
            Err(load_err) => {
                self.finish_load(&full_key, Err(load_err.clone())).await;
                Err(match load_err {
                    LoadError::CircuitOpen(msg) => CacheError::CircuitOpen(msg),
                    LoadError::Failed(msg) => CacheError::Loader(msg),
                })
            }
        }
    }

    /// Deregisters an in-flight load and broadcasts its outcome. Removal
    /// happens before the send so late arrivals retry fresh instead of
    /// replaying a failure.
    async fn finish_load(&self, full_key: &str, outcome: LoadOutcome) {
        let sender = self.inner.pending.lock().await.remove(full_key);
        if let Some(sender) = sender {
            // No receivers is fine; the loader already has the outcome
            let _ = sender.send(outcome);
        }
    }

    // == Pressure Eviction ==
    /// Evicts the given fraction of current entries, least-recently-used
    /// first. Returns count evicted. Used by the coordinator.
    pub async fn evict_fraction(&self, fraction: f64) -> usize {
        let mut store = self.inner.store.write().await;
        let count = ((store.len() as f64) * fraction).ceil() as usize;
        store.evict_lru(count)
    }

    /// Evicts least-recently-used entries until the estimated footprint is
    /// at or below `target_bytes`. Returns count evicted.
    pub async fn evict_to_budget(&self, target_bytes: usize) -> usize {
        let mut store = self.inner.store.write().await;
        store.evict_to_budget(target_bytes)
    }

    // == Snapshots ==
    /// Store-level statistics.
    pub async fn stats(&self) -> CacheStats {
        self.inner.store.read().await.stats()
    }

    /// Current entry count.
    pub async fn key_count(&self) -> usize {
        self.inner.store.read().await.len()
    }

    /// Estimated memory footprint in bytes.
    pub async fn memory_usage(&self) -> usize {
        self.inner.store.read().await.estimated_memory()
    }

    /// Full metrics snapshot: store counters plus operation latency.
    pub async fn metrics(&self) -> CacheMetrics {
        let stats = self.stats().await;
        let latency = self.inner.recorder.latency_snapshot();
        CacheMetrics {
            name: self.inner.name.clone(),
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate(),
            evictions: stats.evictions,
            operations: self.inner.recorder.operations(),
            errors: self.inner.recorder.errors(),
            memory_usage: stats.memory_usage,
            key_count: stats.total_entries,
            latency,
        }
    }

    /// Health snapshot. Unhealthy while the breaker is open, degraded while
    /// it probes recovery, healthy otherwise.
    pub async fn health(&self) -> CacheHealth {
        let stats = self.stats().await;
        let breaker_state = match &self.inner.breaker {
            Some(breaker) => Some(breaker.state().await),
            None => None,
        };

        let status = match breaker_state {
            Some(BreakerState::Open) => HealthStatus::Unhealthy,
            Some(BreakerState::HalfOpen) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        };

        CacheHealth {
            status,
            entries: stats.total_entries,
            memory_usage: stats.memory_usage,
            hit_rate: stats.hit_rate(),
            breaker: breaker_state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    // == Internals ==
    fn prefixed(&self, key: &str) -> String {
        if self.inner.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.inner.key_prefix, key)
        }
    }

    fn record(&self, start: Instant, failed: bool) {
        if self.inner.enable_metrics {
            self.inner.recorder.record(start.elapsed(), failed);
        }
    }
}
