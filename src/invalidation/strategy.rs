//! Invalidation Strategy Module
//!
//! Pluggable strategies computing the set of keys (or `*`-glob patterns) to
//! remove for a given mutation context.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::invalidation::InvalidationContext;

/// Suffix marking an entry stale instead of removing it (lazy strategy).
pub const STALE_SUFFIX: &str = ":stale";

// == Strategy Trait ==
/// Computes keys and patterns to invalidate for a mutation context.
///
/// Strategies must be side-effect free with respect to the cache; the caller
/// applies the returned keys. Errors are propagated, never swallowed.
#[async_trait]
pub trait InvalidationStrategy: Send + Sync {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>>;
}

// == Write-Through ==
/// Invalidates the mutated entity's own key plus the list caches of its
/// type, and the same for every related entity.
#[derive(Debug, Default)]
pub struct WriteThroughStrategy;

#[async_trait]
impl InvalidationStrategy for WriteThroughStrategy {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        if let Some(key) = ctx.entity_key() {
            keys.push(key);
        }
        keys.push(ctx.list_pattern());

        for related in &ctx.related {
            if let Some(key) = related.entity_key() {
                keys.push(key);
            }
            keys.push(related.list_pattern());
        }

        Ok(keys)
    }
}

// == Tag-Based ==
/// One invalidation pattern per tag. No tags yields an empty list, never an
/// error.
#[derive(Debug, Default)]
pub struct TagBasedStrategy;

#[async_trait]
impl InvalidationStrategy for TagBasedStrategy {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>> {
        Ok(ctx
            .tags
            .iter()
            .map(|tag| format!("tag:{}:*", tag))
            .collect())
    }
}

// == Cascade ==
/// Invalidates the entity's own key plus wildcard patterns for every entity
/// type that depends on it, per a static dependency map configured at
/// construction.
#[derive(Debug, Default)]
pub struct CascadeStrategy {
    /// entity type -> dependent entity types
    dependencies: HashMap<String, Vec<String>>,
}

impl CascadeStrategy {
    pub fn new(dependencies: HashMap<String, Vec<String>>) -> Self {
        Self { dependencies }
    }
}

#[async_trait]
impl InvalidationStrategy for CascadeStrategy {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        if let Some(key) = ctx.entity_key() {
            keys.push(key);
        }

        if let Some(dependents) = self.dependencies.get(&ctx.entity) {
            for dependent in dependents {
                keys.push(format!("{}:{}:*", ctx.feature, dependent));
            }
        }

        Ok(keys)
    }
}

// == Lazy ==
/// Marks instead of evicting: wraps an inner strategy and suffixes every
/// computed key with a stale marker. Re-fetch-on-stale-access is the
/// caller's responsibility.
pub struct LazyStrategy {
    inner: Arc<dyn InvalidationStrategy>,
}

impl LazyStrategy {
    pub fn new(inner: Arc<dyn InvalidationStrategy>) -> Self {
        Self { inner }
    }
}

impl Default for LazyStrategy {
    fn default() -> Self {
        Self::new(Arc::new(WriteThroughStrategy))
    }
}

#[async_trait]
impl InvalidationStrategy for LazyStrategy {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>> {
        let keys = self.inner.execute(ctx).await?;
        Ok(keys
            .into_iter()
            .map(|key| format!("{}{}", key, STALE_SUFFIX))
            .collect())
    }
}

// == Conditional ==
/// Gates an inner strategy behind a predicate over the context; returns an
/// empty list when the predicate declines.
pub struct ConditionalStrategy {
    inner: Arc<dyn InvalidationStrategy>,
    predicate: Box<dyn Fn(&InvalidationContext) -> bool + Send + Sync>,
}

impl ConditionalStrategy {
    pub fn new<P>(inner: Arc<dyn InvalidationStrategy>, predicate: P) -> Self
    where
        P: Fn(&InvalidationContext) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            predicate: Box::new(predicate),
        }
    }
}

#[async_trait]
impl InvalidationStrategy for ConditionalStrategy {
    async fn execute(&self, ctx: &InvalidationContext) -> Result<Vec<String>> {
        if (self.predicate)(ctx) {
            self.inner.execute(ctx).await
        } else {
            Ok(Vec::new())
        }
    }
}
