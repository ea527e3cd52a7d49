//! Cache Warmup Task
//!
//! Pre-populates designated keys from source-of-truth loaders on startup or
//! schedule. Warming never overwrites live data, and one entry's loader
//! failure never aborts the rest of the run.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Cache;

/// Boxed async loader producing the value for one warm entry.
pub type WarmLoader =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync>;

// == Warm Entry ==
/// One key to pre-populate: where it goes, how long it lives, and how to
/// load it.
#[derive(Clone)]
pub struct WarmEntry {
    pub key: String,
    pub ttl: Option<u64>,
    pub loader: WarmLoader,
}

impl WarmEntry {
    /// Creates a warm entry from an async closure.
    pub fn new<F, Fut>(key: impl Into<String>, ttl: Option<u64>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            key: key.into(),
            ttl,
            loader: Arc::new(move || Box::pin(loader())),
        }
    }
}

impl std::fmt::Debug for WarmEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmEntry")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

// == Warm Report ==
/// Outcome of one warming run. Partial failure is expected and non-fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmReport {
    /// Entries loaded and stored
    pub warmed: usize,
    /// Entries skipped because the key was already populated
    pub skipped: usize,
    /// Entries whose loader or store failed
    pub failed: usize,
}

// == Warm Cache ==
/// Warms the given entries into the cache.
///
/// Keys that already exist are skipped, never overwritten, so repeated runs
/// are idempotent and each loader executes at most once for a live key.
/// Failures are logged per entry and do not stop the run.
pub async fn warm_cache(cache: &Cache, entries: &[WarmEntry]) -> WarmReport {
    let mut report = WarmReport::default();

    for entry in entries {
        if cache.has(&entry.key).await {
            debug!(cache = cache.name(), key = %entry.key, "warm skip, already populated");
            report.skipped += 1;
            continue;
        }

        match (entry.loader)().await {
            Ok(value) => match cache.set_raw(&entry.key, value, entry.ttl).await {
                Ok(()) => report.warmed += 1,
                Err(err) => {
                    warn!(cache = cache.name(), key = %entry.key, error = %err, "warm store failed");
                    report.failed += 1;
                }
            },
            Err(err) => {
                warn!(cache = cache.name(), key = %entry.key, error = %err, "warm loader failed");
                report.failed += 1;
            }
        }
    }

    info!(
        cache = cache.name(),
        warmed = report.warmed,
        skipped = report.skipped,
        failed = report.failed,
        "cache warming run finished"
    );
    report
}

// == Scheduled Warming ==
/// Spawns a task that re-runs warming on a fixed interval. The first run
/// happens immediately. The returned handle must be aborted on teardown.
pub fn spawn_warm_task(cache: Cache, entries: Vec<WarmEntry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            cache = cache.name(),
            entries = entries.len(),
            interval_secs = interval.as_secs(),
            "scheduled cache warming started"
        );

        loop {
            warm_cache(&cache, &entries).await;
            tokio::time::sleep(interval).await;
        }
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_entry(key: &str, calls: Arc<AtomicU32>) -> WarmEntry {
        WarmEntry::new(key, Some(60), move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("warmed"))
            }
        })
    }

    #[tokio::test]
    async fn test_warm_populates_absent_keys() {
        let cache = Cache::new("warm", CacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));

        let entries = vec![
            counting_entry("a", calls.clone()),
            counting_entry("b", calls.clone()),
        ];
        let report = warm_cache(&cache, &entries).await;

        assert_eq!(report, WarmReport { warmed: 2, skipped: 0, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.has("a").await);
        assert!(cache.has("b").await);
    }

    #[tokio::test]
    async fn test_warm_never_overwrites_live_data() {
        let cache = Cache::new("warm", CacheConfig::default());
        cache.set("a", &json!("live"), None).await.unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let report = warm_cache(&cache, &[counting_entry("a", calls.clone())]).await;

        assert_eq!(report, WarmReport { warmed: 0, skipped: 1, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 0, "loader must not run for live keys");

        let value: Option<String> = cache.get("a").await.unwrap();
        assert_eq!(value, Some("live".to_string()));
    }

    #[tokio::test]
    async fn test_warm_twice_invokes_each_loader_at_most_once() {
        let cache = Cache::new("warm", CacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let entries = vec![counting_entry("a", calls.clone())];

        warm_cache(&cache, &entries).await;
        let second = warm_cache(&cache, &entries).await;

        assert_eq!(second, WarmReport { warmed: 0, skipped: 1, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warm_failure_does_not_abort_run() {
        let cache = Cache::new("warm", CacheConfig::default());

        let failing = WarmEntry::new("bad", None, || async { Err(anyhow!("source down")) });
        let calls = Arc::new(AtomicU32::new(0));
        let entries = vec![failing, counting_entry("good", calls.clone())];

        let report = warm_cache(&cache, &entries).await;

        assert_eq!(report, WarmReport { warmed: 1, skipped: 0, failed: 1 });
        assert!(cache.has("good").await, "later entries still warm after a failure");
        assert!(!cache.has("bad").await);
    }

    #[tokio::test]
    async fn test_spawn_warm_task_runs_and_aborts() {
        let cache = Cache::new("warm", CacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let entries = vec![counting_entry("a", calls.clone())];

        let handle = spawn_warm_task(cache.clone(), entries, Duration::from_secs(60));

        // First run happens immediately
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.has("a").await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.abort();
    }
}
