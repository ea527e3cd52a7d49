//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! access metadata for LRU ordering and popularity diagnostics.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

/// Fixed per-entry bookkeeping overhead used in memory estimation.
const ENTRY_OVERHEAD_BYTES: usize = 80;

/// Fallback value-size estimate when serialization fails.
const FALLBACK_VALUE_BYTES: usize = 1024;

// == Cache Entry ==
/// Represents a single cache entry with an opaque JSON payload and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds); reset on overwrite
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Timestamp of the last successful read (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Number of successful reads since insertion
    pub access_count: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds; None or 0 = never expires
    pub fn new(value: Value, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_seconds
            .filter(|ttl| *ttl > 0)
            .map(|ttl| now + (ttl * 1000));

        Self {
            value,
            created_at: now,
            expires_at,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current
    /// time is greater than or equal to the expiration time, so once the TTL
    /// duration has fully elapsed the entry is immediately unavailable.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a successful read, updating recency and the access counter.
    pub fn touch(&mut self) {
        self.last_accessed_at = current_timestamp_ms();
        self.access_count = self.access_count.saturating_add(1);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the entry has expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            expires.saturating_sub(now)
        })
    }

    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }

    // == Size Estimation ==
    /// Estimates the in-memory footprint of this entry under the given key.
    ///
    /// Key bytes are counted twice (UTF-16-equivalent encoding), the value
    /// contributes its serialized length, and a fixed overhead covers entry
    /// bookkeeping. Serialization failures fall back to a flat estimate and
    /// are never surfaced.
    pub fn estimated_size(&self, key: &str) -> usize {
        let value_size = serde_json::to_string(&self.value)
            .map(|s| s.len())
            .unwrap_or(FALLBACK_VALUE_BYTES);
        key.len() * 2 + value_size + ENTRY_OVERHEAD_BYTES
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
