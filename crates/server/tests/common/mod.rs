//! Common test utilities for in-process HTTP testing.
//!
//! The fixture wires the real router to a SQLite store in a temp directory and
//! the in-memory signal, queue, heartbeat and extractor implementations, so no
//! Redis or yt-dlp is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vidkeep_core::{
    config::{Config, DatabaseConfig, StorageConfig},
    testing::{MemoryCancelSignals, MemoryHeartbeatStore, MemoryJobQueue, MockExtractor},
    video::CompletedVideo,
    MediaLayout, SessionRegistry, SqliteVideoStore, VideoStore,
};

/// Re-export fixtures for test convenience
pub use vidkeep_core::testing::fixtures;

/// Test fixture for HTTP tests with in-memory dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub store: Arc<SqliteVideoStore>,
    pub signals: Arc<MemoryCancelSignals>,
    pub queue: Arc<MemoryJobQueue>,
    pub extractor: Arc<MockExtractor>,
    pub heartbeats: Arc<MemoryHeartbeatStore>,
    pub sessions: SessionRegistry,
    pub layout: MediaLayout,
    /// Temporary directory for the database and media
    pub temp_dir: TempDir,
}

/// Response from a JSON request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Response with the raw body bytes
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_extractor(MockExtractor::new()).await
    }

    pub async fn with_extractor(extractor: MockExtractor) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            storage: StorageConfig {
                data_path: temp_dir.path().to_path_buf(),
            },
            ..Default::default()
        };

        let layout = MediaLayout::new(temp_dir.path());
        layout.ensure_dirs().expect("Failed to create media dirs");

        let store = Arc::new(SqliteVideoStore::new(&db_path).expect("Failed to create store"));
        let signals = Arc::new(MemoryCancelSignals::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let extractor = Arc::new(extractor);
        let heartbeats = Arc::new(MemoryHeartbeatStore::new());
        let sessions = SessionRegistry::new();

        let state = Arc::new(vidkeep_server::state::AppState::new(
            config,
            store.clone(),
            signals.clone(),
            queue.clone(),
            extractor.clone(),
            heartbeats.clone(),
            layout.clone(),
            sessions.clone(),
        ));

        let router = vidkeep_server::api::create_router(state);

        Self {
            router,
            store,
            signals,
            queue,
            extractor,
            heartbeats,
            sessions,
            layout,
            temp_dir,
        }
    }

    /// Insert a completed video whose media file holds `contents`.
    pub fn seed_complete(&self, video_id: &str, contents: &[u8]) {
        self.store.create(fixtures::new_video(video_id)).unwrap();
        self.store.begin_download(video_id).unwrap();
        std::fs::write(self.layout.video_path(video_id), contents).unwrap();
        self.store
            .complete(
                video_id,
                CompletedVideo {
                    title: format!("Video {}", video_id),
                    channel_name: "Test Channel".to_string(),
                    channel_id: None,
                    duration_seconds: Some(212),
                    upload_date: None,
                    description: None,
                    file_size_bytes: contents.len() as u64,
                },
            )
            .unwrap();
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send a GET request with extra headers and keep the raw body.
    pub async fn get_raw(&self, path: &str, headers: &[(&str, &str)]) -> RawResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            headers,
            bytes,
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
