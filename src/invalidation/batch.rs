//! Batch Invalidation Module
//!
//! Debounces bursty writes: keys computed by an inner strategy accumulate
//! for a short window, then every pending caller resolves simultaneously
//! with the deduplicated union.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::invalidation::strategy::{InvalidationStrategy, WriteThroughStrategy};
use crate::invalidation::InvalidationContext;

/// Default debounce window.
const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

#[derive(Default)]
struct BatchState {
    /// Keys accumulated in the current window
    pending: HashSet<String>,
    /// Present while a window is open; followers subscribe here
    flush_rx: Option<watch::Receiver<Vec<String>>>,
    flush_tx: Option<watch::Sender<Vec<String>>>,
}

// == Batch Strategy ==
/// Wraps an inner strategy with a debounce window.
///
/// The first caller of a window becomes the flusher: it sleeps out the
/// window, drains the accumulated set, and broadcasts the union. Later
/// callers within the window just subscribe. Callers arriving after the
/// drain open the next window.
pub struct BatchStrategy {
    inner: Arc<dyn InvalidationStrategy>,
    window: Duration,
    state: Mutex<BatchState>,
}

impl BatchStrategy {
    /// Creates a batcher over the given inner strategy with the default
    /// ~100 ms window.
    pub fn new(inner: Arc<dyn InvalidationStrategy>) -> Self {
        Self::with_window(inner, DEFAULT_WINDOW)
    }

    /// Creates a batcher with an explicit debounce window.
    pub fn with_window(inner: Arc<dyn InvalidationStrategy>, window: Duration) -> Self {
        Self {
            inner,
            window,
            state: Mutex::new(BatchState::default()),
        }
    }
}

impl Default for BatchStrategy {
    fn default() -> Self {
        Self::new(Arc::new(WriteThroughStrategy))
    }
}

#[async_trait]
impl InvalidationStrategy for BatchStrategy {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>> {
        let keys = self.inner.execute(ctx).await?;

        // Join the open window, or open one and become its flusher
        let subscription = {
            let mut state = self.state.lock().await;
            state.pending.extend(keys);
            match &state.flush_rx {
                Some(rx) => Some(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(Vec::new());
                    state.flush_rx = Some(rx);
                    state.flush_tx = Some(tx);
                    None
                }
            }
        };

        if let Some(mut rx) = subscription {
            // Another caller flushes this window; wait for the union
            let _ = rx.changed().await;
            return Ok(rx.borrow().clone());
        }

        // This caller flushes. Close the window under the lock so late
        // arrivals start a fresh one before the union is broadcast.
        tokio::time::sleep(self.window).await;
        let (union, tx) = {
            let mut state = self.state.lock().await;
            let mut union: Vec<String> = state.pending.drain().collect();
            union.sort();
            state.flush_rx = None;
            (union, state.flush_tx.take())
        };

        debug!(keys = union.len(), "batched invalidation window flushed");
        if let Some(tx) = tx {
            // No subscribers is fine; this caller already has the union
            let _ = tx.send(union.clone());
        }
        Ok(union)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn short_batcher() -> Arc<BatchStrategy> {
        Arc::new(BatchStrategy::with_window(
            Arc::new(WriteThroughStrategy),
            Duration::from_millis(30),
        ))
    }

    #[tokio::test]
    async fn test_batch_single_caller_gets_own_keys() {
        let batcher = short_batcher();
        let ctx = InvalidationContext::entity("billing", "invoice", "1");

        let keys = batcher.execute(&ctx).await.unwrap();
        assert_eq!(keys, vec!["billing:invoice:*", "billing:invoice:1"]);
    }

    #[tokio::test]
    async fn test_batch_coalesces_window_into_union() {
        let batcher = short_batcher();

        let mut handles = Vec::new();
        for i in 0..3 {
            let batcher = batcher.clone();
            handles.push(tokio::spawn(async move {
                let ctx = InvalidationContext::entity("billing", "invoice", i.to_string());
                batcher.execute(&ctx).await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // Every caller resolves with the same deduplicated union
        let expected: Vec<String> = vec![
            "billing:invoice:*".to_string(),
            "billing:invoice:0".to_string(),
            "billing:invoice:1".to_string(),
            "billing:invoice:2".to_string(),
        ];
        for result in &results {
            assert_eq!(result, &expected);
        }
    }

    #[tokio::test]
    async fn test_batch_windows_are_independent() {
        let batcher = short_batcher();

        let first = batcher
            .execute(&InvalidationContext::entity("billing", "invoice", "1"))
            .await
            .unwrap();
        let second = batcher
            .execute(&InvalidationContext::entity("billing", "customer", "2"))
            .await
            .unwrap();

        // The second window does not replay the first window's keys
        assert!(first.contains(&"billing:invoice:1".to_string()));
        assert!(!second.contains(&"billing:invoice:1".to_string()));
        assert!(second.contains(&"billing:customer:2".to_string()));
    }
}
