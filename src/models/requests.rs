//! Request DTOs for the topic API
//!
//! Defines the query parameters accepted by the listing endpoint.

use serde::{Deserialize, Deserializer};

/// Default page size for `GET /topics`
pub const DEFAULT_LIMIT: usize = 10;

/// Query string for `GET /topics`.
///
/// Missing or malformed values fall back to `offset = 0` and
/// `limit = DEFAULT_LIMIT` rather than rejecting the request.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicsQuery {
    #[serde(default, deserialize_with = "lenient")]
    pub offset: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<usize>,
}

impl TopicsQuery {
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

fn lenient<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.trim().parse().ok()))
}
