//! API Module
//!
//! HTTP handlers and routing for the admin surface.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Aggregated cache metrics
//! - `GET /health` - Coordinator memory health
//! - `POST /invalidate` - Apply an invalidation context
//! - `POST /cleanup` - Force emergency cleanup

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
