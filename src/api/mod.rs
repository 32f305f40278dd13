//! API Module
//!
//! HTTP handlers and routing for the topic REST API.
//!
//! # Endpoints
//! - `GET /topic/:id` - Get a topic, fetching it on a miss
//! - `DELETE /topic/:id` - Drop a topic from the store
//! - `GET /topics` - List topics, most recently updated first
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
