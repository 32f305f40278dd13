//! Integration Tests
//!
//! Drives the HTTP API and the cache end to end against an in-memory origin.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use refresh_cache::{
    api::create_router, models::Topic, AppState, CacheConfig, CacheError, ExpiringCache, Fetcher,
    IndexedStore, Key, StoreOptions,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tower::ServiceExt;

// == Helper Functions ==

#[derive(Default)]
struct MemoryOrigin {
    topics: Mutex<HashMap<Key, Topic>>,
}

impl MemoryOrigin {
    fn with_topics(ids_and_times: &[(Key, i64)]) -> Self {
        let origin = Self::default();
        for &(id, ts) in ids_and_times {
            origin.topics.lock().unwrap().insert(id, topic(id, ts));
        }
        origin
    }
}

#[async_trait]
impl Fetcher for MemoryOrigin {
    type Value = Topic;

    async fn fetch_one(&self, key: Key) -> anyhow::Result<Topic> {
        self.topics
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("topic {key} unknown to origin"))
    }

    async fn fetch_many(&self, _: usize, results: mpsc::Sender<Topic>) -> anyhow::Result<()> {
        let topics: Vec<Topic> = self.topics.lock().unwrap().values().cloned().collect();
        for topic in topics {
            results.send(topic).await?;
        }
        Ok(())
    }
}

fn topic(id: Key, ts: i64) -> Topic {
    Topic {
        id,
        forum_id: 1,
        title: format!("topic {id}"),
        posts: Vec::new(),
        updated_at: Utc.timestamp_opt(ts, 0).single(),
    }
}

fn create_store(origin: MemoryOrigin) -> Arc<IndexedStore<MemoryOrigin>> {
    let cache = ExpiringCache::new(CacheConfig::new(
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ))
    .unwrap();
    IndexedStore::start(Arc::new(cache), origin, StoreOptions::default()).unwrap()
}

fn create_test_app(origin: MemoryOrigin) -> Router {
    create_router(AppState::new(create_store(origin)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Topic Endpoint Tests ==

#[tokio::test]
async fn test_topic_endpoint_fetches_and_serves() {
    let app = create_test_app(MemoryOrigin::with_topics(&[(1, 100), (111241241, 200)]));

    for (id, ts) in [(1u64, 100i64), (111241241, 200)] {
        let (status, json) = get(&app, &format!("/topic/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"].as_u64().unwrap(), id);
        assert_eq!(json["forumId"], 1);
        assert_eq!(json["title"], format!("topic {}", id));
        let updated_at: chrono::DateTime<Utc> =
            serde_json::from_value(json["updatedAt"].clone()).unwrap();
        assert_eq!(updated_at.timestamp(), ts);
    }
}

#[tokio::test]
async fn test_topic_endpoint_origin_failure() {
    let app = create_test_app(MemoryOrigin::default());

    let (status, json) = get(&app, "/topic/9").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "topic 9 unknown to origin");
}

#[tokio::test]
async fn test_topic_endpoint_malformed_id() {
    let app = create_test_app(MemoryOrigin::default());

    let (status, json) = get(&app, "/topic/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_delete_topic_endpoint() {
    let app = create_test_app(MemoryOrigin::with_topics(&[(3, 10)]));
    get(&app, "/topic/3").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/topic/3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/topic/3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Topics Listing Tests ==

#[tokio::test]
async fn test_topics_endpoint_newest_first_and_clamped() {
    let times = [(1, 300), (2, 100), (3, 500), (4, 200), (5, 400)];
    let app = create_test_app(MemoryOrigin::with_topics(&times));
    for (id, _) in times {
        get(&app, &format!("/topic/{}", id)).await;
    }

    let (status, json) = get(&app, "/topics?offset=0&limit=10").await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<u64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 5, 1, 4, 2]);
    assert!(json[0].get("posts").is_none());
}

#[tokio::test]
async fn test_topics_endpoint_defaults_and_zero_limit() {
    let app = create_test_app(MemoryOrigin::with_topics(&[(1, 1), (2, 2)]));
    get(&app, "/topic/1").await;
    get(&app, "/topic/2").await;

    let (status, json) = get(&app, "/topics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = get(&app, "/topics?limit=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());

    let (status, json) = get(&app, "/topics?offset=x&limit=y").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_topics_endpoint_offset_out_of_range() {
    let app = create_test_app(MemoryOrigin::with_topics(&[(1, 1)]));
    get(&app, "/topic/1").await;

    let (status, json) = get(&app, "/topics?offset=5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Offset out of range"));
}

// == Stats and Health ==

#[tokio::test]
async fn test_stats_and_health_endpoints() {
    let app = create_test_app(MemoryOrigin::with_topics(&[(1, 1)]));
    get(&app, "/topic/1").await;
    get(&app, "/topic/1").await;

    let (status, json) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["indexed"], 1);

    let (status, json) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

// == Cache Lifecycle Scenarios ==

#[tokio::test(start_paused = true)]
async fn test_refresh_then_expiry_scenario() {
    let cache = ExpiringCache::new(CacheConfig::new(
        Duration::from_secs(2),
        Duration::from_secs(1),
    ))
    .unwrap();
    let mut notify = cache.notify().unwrap();
    let mut errors = cache.errors().unwrap();

    cache.set(1, "a").await.unwrap();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.get(1).await, Some("a"));

    // First refresh tick, one interval after the set.
    let key = timeout(Duration::from_millis(600), notify.recv())
        .await
        .expect("refresh notification within the interval");
    assert_eq!(key, Some(1));

    // Keep draining notifications; the entry expires 2s after the last read.
    let expired = timeout(Duration::from_millis(1_600), async {
        loop {
            tokio::select! {
                _ = notify.recv() => {}
                err = errors.recv() => return err,
            }
        }
    })
    .await
    .expect("expiration within 2s of the last read")
    .expect("error stream open");

    assert!(matches!(expired, CacheError::EntryExpired { key: 1 }));
    assert_eq!(cache.get(1).await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_set_get_terminate() {
    let cache = Arc::new(
        ExpiringCache::new(CacheConfig::new(
            Duration::from_secs(100_000),
            Duration::from_secs(1),
        ))
        .unwrap(),
    );

    // Drain both streams for the whole test.
    let mut notify = cache.notify().unwrap();
    let mut errors = cache.errors().unwrap();
    let listener = tokio::spawn(async move {
        let mut received_errors = 0usize;
        loop {
            tokio::select! {
                key = notify.recv() => if key.is_none() { break },
                err = errors.recv() => match err {
                    Some(_) => received_errors += 1,
                    None => break,
                },
            }
        }
        received_errors
    });

    let n = 500u64;
    let mut sets = Vec::new();
    for key in 0..n {
        let cache = Arc::clone(&cache);
        sets.push(tokio::spawn(async move {
            cache.set(key, format!("forum{}", key)).await.unwrap();
        }));
    }
    for set in sets {
        set.await.unwrap();
    }
    assert_eq!(cache.len().await, n as usize);

    let mut gets = Vec::new();
    for key in 0..n {
        let cache = Arc::clone(&cache);
        gets.push(tokio::spawn(async move {
            assert_eq!(cache.get(key).await, Some(format!("forum{}", key)));
        }));
    }
    for get in gets {
        get.await.unwrap();
    }

    cache.terminate().await;
    assert_eq!(cache.len().await, 0);

    let mut gets = Vec::new();
    for key in 0..n {
        let cache = Arc::clone(&cache);
        gets.push(tokio::spawn(async move {
            assert_eq!(cache.get(key).await, None);
        }));
    }
    for get in gets {
        get.await.unwrap();
    }

    let received_errors = listener.await.unwrap();
    assert_eq!(received_errors, 0, "No entry should have expired");
}

#[tokio::test]
async fn test_warm_up_fills_listing() {
    let origin = MemoryOrigin::with_topics(&[(1, 10), (2, 30), (3, 20)]);
    let cache = ExpiringCache::new(CacheConfig::new(
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ))
    .unwrap();
    let options = StoreOptions {
        warm_up_pages: 1,
        ..StoreOptions::default()
    };
    let store = IndexedStore::start(Arc::new(cache), origin, options).unwrap();

    let listed = timeout(Duration::from_secs(5), async {
        loop {
            let listed = store.list(0, 10).await.unwrap();
            if listed.len() == 3 {
                return listed;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("warm-up should store every origin topic");

    let ids: Vec<Key> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);

    store.terminate().await;
}
