//! Cache Coordinator Module
//!
//! Watches aggregate memory usage across every registered cache instance and
//! runs regular or emergency cleanup when thresholds are crossed. Reads go
//! through the metrics collector; each instance keeps its own lock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::metrics::MetricsCollector;

// == Coordinator Config ==
/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Memory-check interval
    pub interval: Duration,
    /// Aggregate memory budget in megabytes
    pub max_total_memory_mb: usize,
    /// Usage percentage above which emergency cleanup runs
    pub emergency_threshold: f64,
    /// Usage percentage the emergency path drives toward after TTL cleanup
    pub after_cleanup_target: f64,
    /// Fraction of the dominant cache's entries evicted under pressure
    pub pressure_evict_fraction: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            max_total_memory_mb: 100,
            emergency_threshold: 80.0,
            after_cleanup_target: 60.0,
            pressure_evict_fraction: 0.20,
        }
    }
}

// == Coordinator Health ==
/// Aggregate health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorHealth {
    /// True while usage is below the emergency threshold
    pub healthy: bool,
    pub usage_percent: f64,
    pub total_memory_bytes: usize,
    pub budget_bytes: usize,
    pub caches: Vec<CacheUsage>,
}

/// Per-instance usage line in the health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CacheUsage {
    pub name: String,
    pub entries: usize,
    pub memory_bytes: usize,
}

/// The coordinator's poll-and-clean logic, shared with its background loop.
struct CoordinatorCore {
    collector: Arc<MetricsCollector>,
    config: CoordinatorConfig,
}

impl CoordinatorCore {
    fn budget_bytes(&self) -> usize {
        self.config.max_total_memory_mb * 1024 * 1024
    }

    async fn usage_percent(&self) -> f64 {
        let total = self.collector.total_memory_usage().await;
        let budget = self.budget_bytes();
        if budget == 0 {
            return 0.0;
        }
        total as f64 / budget as f64 * 100.0
    }

    /// One check: emergency cleanup above the threshold, regular TTL cleanup
    /// otherwise. Returns entries removed.
    async fn run_cycle(&self) -> usize {
        let usage = self.usage_percent().await;
        if usage > self.config.emergency_threshold {
            warn!(usage_percent = usage, "memory pressure, emergency cleanup");
            self.emergency_cleanup().await
        } else {
            self.regular_cleanup().await
        }
    }

    /// TTL cleanup across every registered instance.
    async fn regular_cleanup(&self) -> usize {
        let mut removed = 0;
        for cache in self.collector.caches() {
            removed += cache.cleanup().await;
        }
        removed
    }

    /// Emergency path: TTL cleanup everywhere, then pressure eviction from
    /// the dominant instance while usage stays above the post-cleanup target.
    async fn emergency_cleanup(&self) -> usize {
        let mut removed = self.regular_cleanup().await;

        let target_percent = self.config.after_cleanup_target;
        if self.usage_percent().await > target_percent {
            if let Some(dominant) = self.dominant_cache().await {
                let evicted = dominant
                    .evict_fraction(self.config.pressure_evict_fraction)
                    .await;
                warn!(
                    cache = dominant.name(),
                    evicted, "pressure eviction from dominant cache"
                );
                removed += evicted;

                // Fraction eviction may not be enough for very skewed
                // stores; fall back to a byte-budget sweep of the same cache
                if self.usage_percent().await > target_percent {
                    let mut others = 0;
                    for cache in self.collector.caches() {
                        if cache.name() != dominant.name() {
                            others += cache.memory_usage().await;
                        }
                    }
                    let budget_target =
                        (self.budget_bytes() as f64 * target_percent / 100.0) as usize;
                    let dominant_target = budget_target.saturating_sub(others);
                    removed += dominant.evict_to_budget(dominant_target).await;
                }
            }
        }

        removed
    }

    /// The registered instance with the largest estimated footprint.
    async fn dominant_cache(&self) -> Option<Cache> {
        let mut dominant: Option<Cache> = None;
        let mut dominant_usage = 0;
        for cache in self.collector.caches() {
            let usage = cache.memory_usage().await;
            if dominant.is_none() || usage > dominant_usage {
                dominant_usage = usage;
                dominant = Some(cache);
            }
        }
        dominant
    }
}

// == Cache Coordinator ==
/// Coordinates cleanup across independent cache instances.
pub struct CacheCoordinator {
    core: Arc<CoordinatorCore>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CacheCoordinator {
    /// Creates a coordinator reading from the given collector.
    pub fn new(collector: Arc<MetricsCollector>, config: CoordinatorConfig) -> Self {
        Self {
            core: Arc::new(CoordinatorCore { collector, config }),
            handle: Mutex::new(None),
        }
    }

    /// Current aggregate usage as a percentage of the budget.
    pub async fn usage_percent(&self) -> f64 {
        self.core.usage_percent().await
    }

    /// One on-demand check cycle. Returns entries removed.
    pub async fn run_cycle(&self) -> usize {
        self.core.run_cycle().await
    }

    // == Start / Stop ==
    /// Starts the periodic check loop. Idempotent: returns false without
    /// spawning when already running.
    pub fn start(&self) -> bool {
        let mut handle = match self.handle.lock() {
            Ok(handle) => handle,
            Err(_) => return false,
        };
        if handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return false;
        }

        let core = Arc::clone(&self.core);
        let interval = core.config.interval;
        *handle = Some(tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "cache coordinator started");
            loop {
                tokio::time::sleep(interval).await;
                let removed = core.run_cycle().await;
                if removed > 0 {
                    info!(removed, "coordinated cleanup cycle");
                } else {
                    debug!("coordinated cleanup cycle: nothing to remove");
                }
            }
        }));
        true
    }

    /// Stops the check loop. No-op when not running.
    pub fn stop(&self) -> bool {
        let mut handle = match self.handle.lock() {
            Ok(handle) => handle,
            Err(_) => return false,
        };
        match handle.take() {
            Some(task) => {
                task.abort();
                info!("cache coordinator stopped");
                true
            }
            None => false,
        }
    }

    /// True while the check loop is running.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|h| h.as_ref().map(|t| !t.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }

    // == Health ==
    /// Aggregate health: healthy while usage is below the emergency
    /// threshold.
    pub async fn health(&self) -> CoordinatorHealth {
        let mut caches = Vec::new();
        let mut total = 0;
        for cache in self.core.collector.caches() {
            let stats = cache.stats().await;
            total += stats.memory_usage;
            caches.push(CacheUsage {
                name: cache.name().to_string(),
                entries: stats.total_entries,
                memory_bytes: stats.memory_usage,
            });
        }
        caches.sort_by(|a, b| a.name.cmp(&b.name));

        let budget = self.core.budget_bytes();
        let usage_percent = if budget == 0 {
            0.0
        } else {
            total as f64 / budget as f64 * 100.0
        };

        CoordinatorHealth {
            healthy: usage_percent < self.core.config.emergency_threshold,
            usage_percent,
            total_memory_bytes: total,
            budget_bytes: budget,
            caches,
        }
    }

    // == Force Cleanup ==
    /// Runs the emergency path on demand. Returns entries removed.
    pub async fn force_cleanup(&self) -> usize {
        info!("forced emergency cleanup requested");
        self.core.emergency_cleanup().await
    }
}

impl Drop for CacheCoordinator {
    fn drop(&mut self) {
        if let Ok(mut handle) = self.handle.lock() {
            if let Some(task) = handle.take() {
                task.abort();
            }
        }
    }
}
