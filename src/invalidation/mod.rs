//! Invalidation Module
//!
//! Computes which cache keys a mutation invalidates, via pluggable
//! strategies dispatched through a registry.
//!
//! # Strategies
//! - `write-through` - entity key plus list patterns, including related entities
//! - `tag-based` - one pattern per tag
//! - cascade - entity key plus patterns for statically configured dependents
//! - `lazy` - stale markers instead of deletion
//! - batch - debounced union across bursty calls
//! - conditional - predicate-gated wrapper

mod batch;
mod context;
mod manager;
mod strategy;

pub use batch::BatchStrategy;
pub use context::{InvalidationContext, RelatedEntity};
pub use manager::InvalidationManager;
pub use strategy::{
    CascadeStrategy, ConditionalStrategy, InvalidationStrategy, LazyStrategy, TagBasedStrategy,
    WriteThroughStrategy, STALE_SUFFIX,
};
