//! API Handlers
//!
//! HTTP request handlers for each topic endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::Key;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, HealthResponse, StatsResponse, Topic, TopicSummary, TopicsQuery,
};
use crate::store::{Fetcher, IndexedStore};

/// Application state shared across all handlers.
///
/// Holds the indexed topic store; the store owns its own synchronization.
pub struct AppState<F: Fetcher<Value = Topic>> {
    /// Topic store backed by the expiring cache
    pub store: Arc<IndexedStore<F>>,
}

impl<F: Fetcher<Value = Topic>> AppState<F> {
    /// Creates a new AppState around the given store.
    pub fn new(store: Arc<IndexedStore<F>>) -> Self {
        Self { store }
    }
}

impl<F: Fetcher<Value = Topic>> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn parse_id(raw: &str) -> Result<Key> {
    raw.parse()
        .map_err(|_| CacheError::InvalidRequest(format!("Malformed topic id: {}", raw)))
}

/// Handler for GET /topic/:id
///
/// Returns the cached topic, fetching it from the origin on a miss.
pub async fn topic_handler<F: Fetcher<Value = Topic>>(
    State(state): State<AppState<F>>,
    Path(id): Path<String>,
) -> Result<Json<Topic>> {
    let id = parse_id(&id)?;
    let topic = state.store.get_or_fetch(id).await?;

    Ok(Json(topic.as_ref().clone()))
}

/// Handler for GET /topics?offset=&limit=
///
/// Lists cached topics, most recently updated first.
pub async fn topics_handler<F: Fetcher<Value = Topic>>(
    State(state): State<AppState<F>>,
    Query(query): Query<TopicsQuery>,
) -> Result<Json<Vec<TopicSummary>>> {
    let topics = state.store.list(query.offset(), query.limit()).await?;

    Ok(Json(
        topics
            .iter()
            .map(|topic| TopicSummary::from(topic.as_ref()))
            .collect(),
    ))
}

/// Handler for DELETE /topic/:id
///
/// Drops a topic from the cache and the index.
pub async fn delete_topic_handler<F: Fetcher<Value = Topic>>(
    State(state): State<AppState<F>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = parse_id(&id)?;
    state.store.remove(id).await?;

    Ok(Json(DeleteResponse::new(id)))
}

/// Handler for GET /stats
///
/// Returns current cache statistics and the index size.
pub async fn stats_handler<F: Fetcher<Value = Topic>>(
    State(state): State<AppState<F>>,
) -> Json<StatsResponse> {
    let stats = state.store.cache().stats().await;
    let indexed = state.store.index_len().await;

    Json(StatsResponse::new(stats, indexed))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
