//! API Routes
//!
//! Configures the Axum router with all topic endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_topic_handler, health_handler, stats_handler, topic_handler, topics_handler, AppState,
};
use crate::models::Topic;
use crate::store::Fetcher;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /topic/:id` - Get a topic, fetching it on a miss
/// - `DELETE /topic/:id` - Drop a topic from the store
/// - `GET /topics` - List topics, most recently updated first
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router<F: Fetcher<Value = Topic>>(state: AppState<F>) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/topic/:id",
            get(topic_handler::<F>).delete(delete_topic_handler::<F>),
        )
        .route("/topics", get(topics_handler::<F>))
        .route("/stats", get(stats_handler::<F>))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
