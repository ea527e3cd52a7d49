//! Cache Statistics Module
//!
//! Tracks per-store performance counters: hits, misses, evictions, estimated
//! memory, and access timing.

use serde::Serialize;
use std::time::Duration;

// == Cache Stats ==
/// Rolling counters for a single cache store.
///
/// The hit rate is always computed on demand from the raw counters, never
/// stored, so it cannot go stale.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key absent or expired)
    pub misses: u64,
    /// Number of entries evicted under capacity pressure
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Estimated memory footprint in bytes (approximate, never exact)
    pub memory_usage: usize,
    /// Cumulative time spent in read operations, nanoseconds
    access_time_ns: u64,
    /// Number of timed read operations
    accesses: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Average Access Time ==
    /// Average read-operation duration in microseconds, 0.0 when untimed.
    pub fn avg_access_time_us(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.access_time_ns as f64 / self.accesses as f64 / 1000.0
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Access Time ==
    /// Accumulates one read-operation duration.
    pub fn record_access_time(&mut self, elapsed: Duration) {
        self.access_time_ns = self
            .access_time_ns
            .saturating_add(elapsed.as_nanos() as u64);
        self.accesses += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    // == Update Memory Usage ==
    /// Updates the estimated memory footprint.
    pub fn set_memory_usage(&mut self, bytes: usize) {
        self.memory_usage = bytes;
    }

    // == Reset ==
    /// Resets all counters to zero. Used by `clear()`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
