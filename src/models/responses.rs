//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::coordinator::CoordinatorHealth;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// The key that was targeted
    pub key: String,
    /// Whether an entry was actually removed
    pub deleted: bool,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        Self {
            key: key.into(),
            deleted,
        }
    }
}

/// Response body for the invalidate operation (POST /invalidate)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Strategy that computed the keys
    pub strategy: String,
    /// Keys and patterns the strategy produced
    pub keys: Vec<String>,
    /// Entries actually removed from the cache
    pub removed: usize,
}

/// Response body for the force-cleanup operation (POST /cleanup)
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    /// Entries removed by the cleanup run
    pub removed: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status ("healthy" or "unhealthy")
    pub status: String,
    /// Aggregate memory usage as a percentage of the budget
    pub usage_percent: f64,
    /// Estimated total memory across all cache instances
    pub total_memory_bytes: usize,
    /// Configured aggregate budget
    pub budget_bytes: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a HealthResponse from a coordinator health snapshot.
    pub fn from_coordinator(health: &CoordinatorHealth) -> Self {
        Self {
            status: if health.healthy {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            usage_percent: health.usage_percent,
            total_memory_bytes: health.total_memory_bytes,
            budget_bytes: health.budget_bytes,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("test_key", json!({"v": 1}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("test_key"));
        assert!(json.contains("\"v\":1"));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_delete_response_reports_outcome() {
        let resp = DeleteResponse::new("deleted_key", true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("deleted_key"));
        assert!(json.contains("true"));

        let resp = DeleteResponse::new("missing_key", false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("false"));
    }

    #[test]
    fn test_invalidate_response_serialize() {
        let resp = InvalidateResponse {
            strategy: "write-through".to_string(),
            keys: vec!["billing:invoice:42".to_string()],
            removed: 1,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("write-through"));
        assert!(json.contains("billing:invoice:42"));
    }

    #[test]
    fn test_health_response_from_coordinator() {
        let health = CoordinatorHealth {
            healthy: true,
            usage_percent: 12.5,
            total_memory_bytes: 1024,
            budget_bytes: 8192,
            caches: Vec::new(),
        };
        let resp = HealthResponse::from_coordinator(&health);
        assert_eq!(resp.status, "healthy");

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
