//! Response DTOs for the topic API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, Key};
use crate::models::Topic;

/// Listing entry for `GET /topics`: a topic without its posts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub id: Key,
    pub forum_id: Key,
    pub title: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Topic> for TopicSummary {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id,
            forum_id: topic.forum_id,
            title: topic.title.clone(),
            updated_at: topic.updated_at,
        }
    }
}

/// Response body for `DELETE /topic/:id`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The topic that was removed
    pub id: Key,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(id: Key) -> Self {
        Self {
            message: format!("Topic {} removed", id),
            id,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Keep-alive reads that found an entry
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Entries removed by their deadline
    pub expirations: u64,
    /// Refresh notifications delivered
    pub refreshes: u64,
    /// Current number of cached entries
    pub total_entries: usize,
    /// Current number of indexed topics
    pub indexed: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: CacheStats, indexed: usize) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            refreshes: stats.refreshes,
            total_entries: stats.total_entries,
            indexed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
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
