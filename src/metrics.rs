//! Metrics Module
//!
//! Per-instance operation recording (counts, errors, latency) and aggregation
//! across every registered cache instance. Counter updates are lock-free;
//! latency percentiles come from a bounded buffer of recent samples.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::cache::Cache;

/// Recent-latency samples kept for percentile estimation.
const LATENCY_SAMPLE_CAPACITY: usize = 1024;

// == Latency Snapshot ==
/// Operation latency summary in microseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySnapshot {
    pub avg_us: f64,
    pub max_us: u64,
    pub min_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

// == Cache Metrics ==
/// Full metrics snapshot for one cache instance.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub operations: u64,
    pub errors: u64,
    pub memory_usage: usize,
    pub key_count: usize,
    #[serde(flatten)]
    pub latency: LatencySnapshot,
}

// == Metrics Recorder ==
/// Lock-free operation counters plus a bounded latency sample buffer for one
/// cache instance.
pub struct MetricsRecorder {
    operations: AtomicU64,
    errors: AtomicU64,
    total_ns: AtomicU64,
    max_ns: AtomicU64,
    /// u64::MAX until the first sample lands
    min_ns: AtomicU64,
    samples: Mutex<VecDeque<u64>>,
}

impl MetricsRecorder {
    /// Creates a recorder with all counters at zero.
    pub fn new() -> Self {
        Self {
            operations: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            samples: Mutex::new(VecDeque::with_capacity(LATENCY_SAMPLE_CAPACITY)),
        }
    }

    // == Record ==
    /// Records one operation's duration and outcome.
    pub fn record(&self, elapsed: Duration, failed: bool) {
        let ns = elapsed.as_nanos() as u64;

        self.operations.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);

        if let Ok(mut samples) = self.samples.lock() {
            if samples.len() == LATENCY_SAMPLE_CAPACITY {
                samples.pop_front();
            }
            samples.push_back(ns);
        }
    }

    /// Total operations recorded.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Total failed operations recorded.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    // == Latency Snapshot ==
    /// Summarizes recorded latency. Percentiles cover only the most recent
    /// samples; avg/max/min cover the full lifetime.
    pub fn latency_snapshot(&self) -> LatencySnapshot {
        let operations = self.operations.load(Ordering::Relaxed);
        if operations == 0 {
            return LatencySnapshot::default();
        }

        let total_ns = self.total_ns.load(Ordering::Relaxed);
        let max_ns = self.max_ns.load(Ordering::Relaxed);
        let min_ns = self.min_ns.load(Ordering::Relaxed);

        let mut sorted: Vec<u64> = match self.samples.lock() {
            Ok(samples) => samples.iter().copied().collect(),
            Err(_) => Vec::new(),
        };
        sorted.sort_unstable();

        LatencySnapshot {
            avg_us: total_ns as f64 / operations as f64 / 1000.0,
            max_us: max_ns / 1000,
            min_us: if min_ns == u64::MAX { 0 } else { min_ns / 1000 },
            p50_us: percentile(&sorted, 0.50) / 1000,
            p95_us: percentile(&sorted, 0.95) / 1000,
            p99_us: percentile(&sorted, 0.99) / 1000,
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-rank percentile over an ascending-sorted slice; 0 when empty.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

// == Aggregate Metrics ==
/// Metrics summed across every registered cache instance.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateMetrics {
    pub total_hits: u64,
    pub total_misses: u64,
    pub overall_hit_rate: f64,
    pub total_evictions: u64,
    pub total_operations: u64,
    pub total_errors: u64,
    pub total_memory_usage: usize,
    pub total_entries: usize,
    pub caches: Vec<CacheMetrics>,
}

// == Metrics Collector ==
/// Registry of named cache instances with cross-instance aggregation.
///
/// Registration stores a handle clone, so snapshots always reflect live
/// state. Instances are keyed by name; re-registering a name replaces the
/// handle.
#[derive(Default)]
pub struct MetricsCollector {
    caches: RwLock<HashMap<String, Cache>>,
}

impl MetricsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Registers a cache instance under its own name.
    pub fn register(&self, cache: &Cache) {
        if let Ok(mut caches) = self.caches.write() {
            caches.insert(cache.name().to_string(), cache.clone());
        }
    }

    /// Removes a cache instance by name. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        match self.caches.write() {
            Ok(mut caches) => caches.remove(name).is_some(),
            Err(_) => false,
        }
    }

    /// Handles to every registered cache.
    pub fn caches(&self) -> Vec<Cache> {
        match self.caches.read() {
            Ok(caches) => caches.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.caches.read().map(|c| c.len()).unwrap_or(0)
    }

    /// True when no instances are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Aggregate ==
    /// Snapshots every registered instance and sums the totals. The overall
    /// hit rate is recomputed from the summed counters, never averaged.
    pub async fn aggregate(&self) -> AggregateMetrics {
        let mut caches = Vec::new();
        for cache in self.caches() {
            caches.push(cache.metrics().await);
        }
        caches.sort_by(|a, b| a.name.cmp(&b.name));

        let total_hits: u64 = caches.iter().map(|m| m.hits).sum();
        let total_misses: u64 = caches.iter().map(|m| m.misses).sum();
        let total_requests = total_hits + total_misses;
        let overall_hit_rate = if total_requests == 0 {
            0.0
        } else {
            total_hits as f64 / total_requests as f64
        };

        AggregateMetrics {
            total_hits,
            total_misses,
            overall_hit_rate,
            total_evictions: caches.iter().map(|m| m.evictions).sum(),
            total_operations: caches.iter().map(|m| m.operations).sum(),
            total_errors: caches.iter().map(|m| m.errors).sum(),
            total_memory_usage: caches.iter().map(|m| m.memory_usage).sum(),
            total_entries: caches.iter().map(|m| m.key_count).sum(),
            caches,
        }
    }

    /// Sum of estimated memory across registered instances, in bytes.
    pub async fn total_memory_usage(&self) -> usize {
        let mut total = 0;
        for cache in self.caches() {
            total += cache.memory_usage().await;
        }
        total
    }
}
