//! Invalidation Context Module
//!
//! Identifies the logical domain object behind a mutation. Constructed per
//! invalidation call and consumed by exactly one strategy execution; never
//! persisted.

use serde::{Deserialize, Serialize};

// == Related Entity ==
/// A domain object affected alongside the primary one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub feature: String,
    pub entity: String,
    #[serde(default)]
    pub id: Option<String>,
}

// == Invalidation Context ==
/// Describes what changed, so a strategy can compute which keys to remove.
///
/// Keys follow the `feature:entity:id` convention; list caches use
/// `feature:entity:*` patterns and tag caches use `tag:<tag>:*`. The cache
/// core itself treats all of these as opaque strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationContext {
    pub feature: String,
    pub entity: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub related: Vec<RelatedEntity>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl InvalidationContext {
    /// Creates a context for a single entity with no related objects or tags.
    pub fn entity(feature: impl Into<String>, entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            entity: entity.into(),
            id: Some(id.into()),
            related: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Creates a tag-only context.
    pub fn tags(tags: Vec<String>) -> Self {
        Self {
            feature: String::new(),
            entity: String::new(),
            id: None,
            related: Vec::new(),
            tags,
        }
    }

    /// Adds a related entity.
    pub fn with_related(
        mut self,
        feature: impl Into<String>,
        entity: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        self.related.push(RelatedEntity {
            feature: feature.into(),
            entity: entity.into(),
            id,
        });
        self
    }

    /// Specific key for this context's entity, when it has an id.
    pub fn entity_key(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(|id| format!("{}:{}:{}", self.feature, self.entity, id))
    }

    /// Wildcard pattern covering list caches of this entity type.
    pub fn list_pattern(&self) -> String {
        format!("{}:{}:*", self.feature, self.entity)
    }
}

impl RelatedEntity {
    /// Specific key for this related entity, when it has an id.
    pub fn entity_key(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(|id| format!("{}:{}:{}", self.feature, self.entity, id))
    }

    /// Wildcard pattern covering list caches of this entity type.
    pub fn list_pattern(&self) -> String {
        format!("{}:{}:*", self.feature, self.entity)
    }
}
