//! API Handlers
//!
//! HTTP request handlers for the admin surface. The cache core is a
//! programmatic library; this layer is the thin wiring that exposes key
//! operations, statistics, health, invalidation, and forced cleanup.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::config::Config;
use crate::coordinator::CacheCoordinator;
use crate::error::{CacheError, Result};
use crate::invalidation::InvalidationManager;
use crate::metrics::{AggregateMetrics, MetricsCollector};
use crate::models::{
    CleanupResponse, DeleteResponse, GetResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// Every component is an explicitly constructed instance; there is no
/// ambient global state, so tests build isolated copies freely.
#[derive(Clone)]
pub struct AppState {
    /// The primary cache instance served by the key endpoints
    pub cache: Cache,
    /// Cross-instance metrics registry
    pub collector: Arc<MetricsCollector>,
    /// Cross-instance memory coordinator
    pub coordinator: Arc<CacheCoordinator>,
    /// Invalidation strategy registry
    pub invalidation: Arc<InvalidationManager>,
}

impl AppState {
    /// Creates an AppState from explicitly built components.
    pub fn new(
        cache: Cache,
        collector: Arc<MetricsCollector>,
        coordinator: Arc<CacheCoordinator>,
        invalidation: Arc<InvalidationManager>,
    ) -> Self {
        Self {
            cache,
            collector,
            coordinator,
            invalidation,
        }
    }

    /// Creates an AppState from configuration: one primary cache registered
    /// with a fresh collector, a coordinator over that collector, and the
    /// default invalidation strategies.
    pub fn from_config(config: &Config) -> Self {
        let cache = Cache::new("primary", config.cache_config());
        let collector = Arc::new(MetricsCollector::new());
        collector.register(&cache);
        let coordinator = Arc::new(CacheCoordinator::new(
            Arc::clone(&collector),
            config.coordinator_config(),
        ));
        let invalidation = Arc::new(InvalidationManager::with_defaults());
        Self::new(cache, collector, coordinator, invalidation)
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair in the primary cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.set_raw(&req.key, req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key. A miss maps to 404 on this surface; the
/// library API itself reports misses as `None`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get_raw(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deletes a key, reporting whether an entry was actually removed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.del(&key).await;
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for GET /stats
///
/// Returns metrics aggregated across every registered cache instance.
pub async fn stats_handler(State(state): State<AppState>) -> Json<AggregateMetrics> {
    Json(state.collector.aggregate().await)
}

/// Handler for GET /health
///
/// Returns the coordinator's aggregate memory health.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.coordinator.health().await;
    Json(HealthResponse::from_coordinator(&health))
}

/// Handler for POST /invalidate
///
/// Computes and applies invalidation for a mutation context. Strategy
/// failures surface as errors; silent invalidation failure is disallowed.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let strategy = req.strategy.as_deref();
    let (keys, removed) = state
        .invalidation
        .invalidate_cache(&state.cache, &req.context, strategy)
        .await?;

    Ok(Json(InvalidateResponse {
        strategy: strategy.unwrap_or("write-through").to_string(),
        keys,
        removed,
    }))
}

/// Handler for POST /cleanup
///
/// Runs the emergency cleanup path on demand.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.coordinator.force_cleanup().await;
    Json(CleanupResponse { removed })
}
