//! TTL Reaper Task
//!
//! Background task that periodically removes expired cache entries,
//! independent of access.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

// == TTL Reaper ==
/// Owns the periodic expiry sweep for one cache instance.
///
/// `start` and `stop` are idempotent: a second start never spawns a duplicate
/// timer, and stopping a stopped reaper is a no-op. Dropping the reaper
/// cancels the task so a forgotten handle cannot keep the process alive.
pub struct TtlReaper {
    cache: Cache,
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TtlReaper {
    /// Creates a reaper for the given cache. Nothing runs until `start`.
    pub fn new(cache: Cache, interval: Duration) -> Self {
        Self {
            cache,
            interval,
            handle: Mutex::new(None),
        }
    }

    // == Start ==
    /// Spawns the sweep loop. Returns false without spawning when already
    /// running.
    pub fn start(&self) -> bool {
        let mut handle = match self.handle.lock() {
            Ok(handle) => handle,
            Err(_) => return false,
        };
        if handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return false;
        }

        let cache = self.cache.clone();
        let interval = self.interval;
        *handle = Some(tokio::spawn(async move {
            info!(
                cache = cache.name(),
                interval_secs = interval.as_secs(),
                "TTL reaper started"
            );

            loop {
                tokio::time::sleep(interval).await;

                let removed = cache.cleanup().await;
                if removed > 0 {
                    info!(cache = cache.name(), removed, "TTL sweep removed expired entries");
                } else {
                    debug!(cache = cache.name(), "TTL sweep: no expired entries");
                }
            }
        }));
        true
    }

    // == Stop ==
    /// Cancels the sweep loop. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        let mut handle = match self.handle.lock() {
            Ok(handle) => handle,
            Err(_) => return false,
        };
        match handle.take() {
            Some(task) => {
                task.abort();
                info!(cache = self.cache.name(), "TTL reaper stopped");
                true
            }
            None => false,
        }
    }

    /// True while the sweep loop is running.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|h| h.as_ref().map(|t| !t.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }
}

impl Drop for TtlReaper {
    fn drop(&mut self) {
        if let Ok(mut handle) = self.handle.lock() {
            if let Some(task) = handle.take() {
                task.abort();
            }
        }
    }
}
