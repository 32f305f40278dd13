//! Error types for the refresh cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::cache::Key;
use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache, the indexed store and the HTTP layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent on a read that requires presence
    #[error("Key not found: {0}")]
    NotFound(Key),

    /// Entry reached its deadline without a keep-alive read.
    /// The entry is already gone by the time this is observed.
    #[error("Cache expired for ID: {key}")]
    EntryExpired { key: Key },

    /// `List` offset beyond the index bound
    #[error("Offset out of range: {offset} (index holds {len} entries)")]
    OffsetOutOfRange { offset: usize, len: usize },

    /// An indexed value could not be interpreted as an ordered record
    #[error("Cached value for ID {key} cannot be ordered: missing updated_at")]
    TypeMismatch { key: Key },

    /// Error reported by the origin fetcher, message unchanged
    #[error(transparent)]
    FetchFailed(#[from] anyhow::Error),

    /// The cache was terminated; no further writes are accepted
    #[error("Cache terminated")]
    Terminated,

    /// A single-consumer event stream was already handed out
    #[error("Stream already claimed: {0}")]
    StreamClaimed(&'static str),

    /// Rejected cache configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::OffsetOutOfRange { .. } | CacheError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            CacheError::Terminated => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
