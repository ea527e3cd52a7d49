//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::breaker::BreakerConfig;
use crate::cache::CacheConfig;
use crate::coordinator::CoordinatorConfig;

/// Configuration parameters for the caching layer and its admin surface.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries per cache instance (0 = unbounded)
    pub max_entries: usize,
    /// Soft cap on aggregate memory across all cache instances, in megabytes
    pub max_memory_mb: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Background TTL sweep interval in seconds
    pub cleanup_interval: u64,
    /// Namespace prefix transparently applied to all keys
    pub key_prefix: String,
    /// Toggles latency sampling overhead
    pub enable_metrics: bool,
    /// Consecutive failures before the circuit breaker opens
    pub breaker_threshold: u32,
    /// Failure-relevance window in seconds (stale failure streaks restart)
    pub breaker_timeout: u64,
    /// Cooldown in seconds before an open circuit probes recovery
    pub breaker_reset_timeout: u64,
    /// Coordinator memory-check interval in seconds
    pub coordinator_interval: u64,
    /// Aggregate usage percentage that triggers emergency cleanup
    pub emergency_threshold: f64,
    /// HTTP admin server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Max entries per cache instance (default: 1000)
    /// - `MAX_MEMORY_MB` - Aggregate memory budget in MB (default: 100)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - TTL sweep frequency in seconds (default: 300)
    /// - `KEY_PREFIX` - Key namespace prefix (default: empty)
    /// - `ENABLE_METRICS` - Latency sampling toggle (default: true)
    /// - `BREAKER_THRESHOLD` - Failures before the circuit opens (default: 5)
    /// - `BREAKER_TIMEOUT` - Failure-relevance window in seconds (default: 60)
    /// - `BREAKER_RESET_TIMEOUT` - Open-circuit cooldown in seconds (default: 30)
    /// - `COORDINATOR_INTERVAL` - Memory-check frequency in seconds (default: 600)
    /// - `EMERGENCY_THRESHOLD` - Usage percent for emergency cleanup (default: 80)
    /// - `SERVER_PORT` - HTTP admin port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            max_entries: parse_env("MAX_ENTRIES", 1000),
            max_memory_mb: parse_env("MAX_MEMORY_MB", 100),
            default_ttl: parse_env("DEFAULT_TTL", 300),
            cleanup_interval: parse_env("CLEANUP_INTERVAL", 300),
            key_prefix: env::var("KEY_PREFIX").unwrap_or_default(),
            enable_metrics: parse_env("ENABLE_METRICS", true),
            breaker_threshold: parse_env("BREAKER_THRESHOLD", 5),
            breaker_timeout: parse_env("BREAKER_TIMEOUT", 60),
            breaker_reset_timeout: parse_env("BREAKER_RESET_TIMEOUT", 30),
            coordinator_interval: parse_env("COORDINATOR_INTERVAL", 600),
            emergency_threshold: parse_env("EMERGENCY_THRESHOLD", 80.0),
            server_port: parse_env("SERVER_PORT", 3000),
        }
    }

    /// Per-instance cache configuration derived from this config.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.max_entries,
            default_ttl: self.default_ttl,
            key_prefix: self.key_prefix.clone(),
            enable_metrics: self.enable_metrics,
            breaker: Some(self.breaker_config()),
        }
    }

    /// Circuit breaker tuning derived from this config.
    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_threshold,
            failure_window: Duration::from_secs(self.breaker_timeout),
            reset_timeout: Duration::from_secs(self.breaker_reset_timeout),
            ..BreakerConfig::default()
        }
    }

    /// Coordinator tuning derived from this config.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            interval: Duration::from_secs(self.coordinator_interval),
            max_total_memory_mb: self.max_memory_mb,
            emergency_threshold: self.emergency_threshold,
            ..CoordinatorConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_memory_mb: 100,
            default_ttl: 300,
            cleanup_interval: 300,
            key_prefix: String::new(),
            enable_metrics: true,
            breaker_threshold: 5,
            breaker_timeout: 60,
            breaker_reset_timeout: 30,
            coordinator_interval: 600,
            emergency_threshold: 80.0,
            server_port: 3000,
        }
    }
}

/// Parses an environment variable, falling back to a default on absence or
/// parse failure.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
