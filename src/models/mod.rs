//! Domain and transport models
//!
//! The cached topic records plus the DTOs used for serializing HTTP
//! request and response bodies.

pub mod requests;
pub mod responses;
pub mod topic;

// Re-export commonly used types
pub use requests::TopicsQuery;
pub use responses::{
    DeleteResponse, ErrorResponse, HealthResponse, StatsResponse, TopicSummary,
};
pub use topic::{Post, Topic};
