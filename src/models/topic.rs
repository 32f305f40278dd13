//! Topic records
//!
//! A forum topic and its posts, as served by the origin and held in the
//! store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Key;
use crate::store::Record;

// == Post ==
/// A single post inside a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub serial: i64,
    pub topic_id: Key,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: String,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_by: String,
    pub content: String,
}

// == Topic ==
/// A forum topic, keyed by its id and ordered by its last update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Key,
    pub forum_id: Key,
    pub title: String,
    #[serde(default)]
    pub posts: Vec<Post>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Topic {
    fn key(&self) -> Key {
        self.id
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}
