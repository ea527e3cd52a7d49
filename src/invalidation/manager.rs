//! Invalidation Manager Module
//!
//! Registry dispatching invalidation calls to named strategies, with one
//! designated default. Strategy failures are logged and rethrown; silent
//! invalidation failure is disallowed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::cache::Cache;
use crate::error::{CacheError, Result};
use crate::invalidation::strategy::{
    InvalidationStrategy, LazyStrategy, TagBasedStrategy, WriteThroughStrategy,
};
use crate::invalidation::InvalidationContext;

// == Invalidation Manager ==
/// Maps strategy names to instances and dispatches invalidation calls.
pub struct InvalidationManager {
    strategies: HashMap<String, Arc<dyn InvalidationStrategy>>,
    default_strategy: String,
}

impl InvalidationManager {
    /// Creates an empty manager with the given default strategy name. The
    /// named strategy must be registered before the first dispatch.
    pub fn new(default_strategy: impl Into<String>) -> Self {
        Self {
            strategies: HashMap::new(),
            default_strategy: default_strategy.into(),
        }
    }

    /// Creates a manager with the built-in strategies registered:
    /// `write-through` (default), `tag-based`, and `lazy`.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new("write-through");
        manager.register("write-through", Arc::new(WriteThroughStrategy));
        manager.register("tag-based", Arc::new(TagBasedStrategy));
        manager.register("lazy", Arc::new(LazyStrategy::default()));
        manager
    }

    // == Register ==
    /// Registers a strategy under a name, replacing any previous holder.
    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn InvalidationStrategy>) {
        self.strategies.insert(name.into(), strategy);
    }

    /// Changes the default strategy. Fails if the name is unregistered.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.strategies.contains_key(name) {
            return Err(CacheError::UnknownStrategy(name.to_string()));
        }
        self.default_strategy = name.to_string();
        Ok(())
    }

    /// Names of all registered strategies.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }

    // == Invalidate ==
    /// Dispatches to the named strategy (or the default) and returns the
    /// computed keys and patterns. Strategy errors are logged and propagated
    /// to the caller.
    pub async fn invalidate(
        &self,
        ctx: &InvalidationContext,
        strategy: Option<&str>,
    ) -> Result<Vec<String>> {
        let name = strategy.unwrap_or(&self.default_strategy);
        let strategy = self
            .strategies
            .get(name)
            .ok_or_else(|| CacheError::UnknownStrategy(name.to_string()))?;

        match strategy.execute(ctx).await {
            Ok(keys) => {
                info!(
                    strategy = name,
                    feature = %ctx.feature,
                    entity = %ctx.entity,
                    keys = keys.len(),
                    "invalidation computed"
                );
                Ok(keys)
            }
            Err(err) => {
                error!(strategy = name, error = %err, "invalidation strategy failed");
                Err(err)
            }
        }
    }

    // == Invalidate Cache ==
    /// Computes keys via [`invalidate`](Self::invalidate) and applies them to
    /// the given cache: glob patterns go through pattern deletion, plain keys
    /// through single deletion. Returns the computed keys and the number of
    /// entries actually removed.
    pub async fn invalidate_cache(
        &self,
        cache: &Cache,
        ctx: &InvalidationContext,
        strategy: Option<&str>,
    ) -> Result<(Vec<String>, usize)> {
        let keys = self.invalidate(ctx, strategy).await?;

        let mut removed = 0;
        for key in &keys {
            if key.contains('*') {
                removed += cache.delete_pattern(key).await;
            } else if cache.del(key).await {
                removed += 1;
            }
        }

        Ok((keys, removed))
    }
}

impl Default for InvalidationManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
