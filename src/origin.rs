//! Origin Fetcher
//!
//! [`Fetcher`] implementation reading topics from a JSON origin over HTTP.
//!
//! # Origin Endpoints
//! - `GET {origin}/topic/{id}` - one topic with its posts
//! - `GET {origin}/topics?page={n}` - one listing page of topics

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::Key;
use crate::models::Topic;
use crate::store::Fetcher;

/// Fetches topics from a JSON origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Creates a fetcher for the origin at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("decoding response of GET {url}"))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    type Value = Topic;

    async fn fetch_one(&self, key: Key) -> anyhow::Result<Topic> {
        let url = format!("{}/topic/{}", self.base_url, key);
        debug!(key, "fetching topic from origin");
        self.get_json(&url).await
    }

    async fn fetch_many(
        &self,
        max_pages: usize,
        results: mpsc::Sender<Topic>,
    ) -> anyhow::Result<()> {
        for page in 0..max_pages {
            let url = format!("{}/topics?page={}", self.base_url, page);
            let topics: Vec<Topic> = self.get_json(&url).await?;
            if topics.is_empty() {
                break;
            }

            debug!(page, count = topics.len(), "listing page fetched");
            for topic in topics {
                results
                    .send(topic)
                    .await
                    .context("topic receiver closed")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Page {
        page: usize,
    }

    fn topic(id: Key) -> Topic {
        Topic {
            id,
            forum_id: 1,
            title: format!("topic {id}"),
            posts: Vec::new(),
            updated_at: None,
        }
    }

    async fn spawn_origin() -> String {
        let app = Router::new()
            .route(
                "/topic/:id",
                get(|Path(id): Path<Key>| async move {
                    if id == 404 {
                        Err(StatusCode::NOT_FOUND)
                    } else {
                        Ok(Json(topic(id)))
                    }
                }),
            )
            .route(
                "/topics",
                get(|Query(q): Query<Page>| async move {
                    // Two pages of two topics, then nothing.
                    let topics: Vec<Topic> = match q.page {
                        0 => vec![topic(1), topic(2)],
                        1 => vec![topic(3), topic(4)],
                        _ => Vec::new(),
                    };
                    Json(topics)
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_fetch_one() {
        let fetcher = HttpFetcher::new(spawn_origin().await);

        let topic = fetcher.fetch_one(42).await.unwrap();
        assert_eq!(topic.id, 42);
        assert_eq!(topic.title, "topic 42");
    }

    #[tokio::test]
    async fn test_fetch_one_http_error() {
        let fetcher = HttpFetcher::new(spawn_origin().await);

        let err = fetcher.fetch_one(404).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_many_stops_at_empty_page() {
        let fetcher = HttpFetcher::new(spawn_origin().await);
        let (tx, mut rx) = mpsc::channel(16);

        fetcher.fetch_many(10, tx).await.unwrap();

        let mut ids = Vec::new();
        while let Some(topic) = rx.recv().await {
            ids.push(topic.id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_fetch_many_respects_page_limit() {
        let fetcher = HttpFetcher::new(spawn_origin().await);
        let (tx, mut rx) = mpsc::channel(16);

        fetcher.fetch_many(1, tx).await.unwrap();

        let mut ids = Vec::new();
        while let Some(topic) = rx.recv().await {
            ids.push(topic.id);
        }
        assert_eq!(ids, vec![1, 2]);
    }
}
