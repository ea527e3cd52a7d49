//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;
use crate::invalidation::InvalidationContext;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The JSON value to store
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Request body for the invalidate operation (POST /invalidate)
///
/// Carries the invalidation context plus an optional strategy name; the
/// manager's default strategy is used when none is given.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    #[serde(flatten)]
    pub context: InvalidationContext,
    /// Optional strategy name
    #[serde(default)]
    pub strategy: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request data.
    pub fn validate(&self) -> Option<String> {
        if self.context.feature.is_empty()
            && self.context.entity.is_empty()
            && self.context.tags.is_empty()
        {
            return Some("Invalidation context requires a feature/entity or tags".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"a": 1}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"a": 1}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: json!("test"),
            ttl: Some(60),
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_invalidate_request_deserialize_flattened() {
        let json = r#"{"feature": "billing", "entity": "invoice", "id": "42", "strategy": "lazy"}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.context.feature, "billing");
        assert_eq!(req.context.id.as_deref(), Some("42"));
        assert_eq!(req.strategy.as_deref(), Some("lazy"));
    }

    #[test]
    fn test_invalidate_request_requires_context() {
        let json = r#"{"feature": "", "entity": ""}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_some());

        let json = r#"{"feature": "", "entity": "", "tags": ["hot"]}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_none());
    }
}
