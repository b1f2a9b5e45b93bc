//! In-process HTTP tests for the API surface.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use vidkeep_core::testing::MockExtractor;
use vidkeep_core::{VideoStatus, VideoStore};

use common::{fixtures, TestFixture};

const ID: &str = "dQw4w9WgXcQ";
const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn media(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Health, config and metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;
    let resp = fixture.get("/health").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_redis_health_lists_live_workers() {
    use std::time::Duration;
    use vidkeep_core::HeartbeatStore;

    let fixture = TestFixture::new().await;
    let resp = fixture.get("/health/redis").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["workers"]["active"], 0);

    fixture
        .heartbeats
        .beat("worker-b", Duration::from_secs(30))
        .await
        .unwrap();
    fixture
        .heartbeats
        .beat("worker-a", Duration::from_secs(30))
        .await
        .unwrap();

    let resp = fixture.get("/health/redis").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "healthy");
    assert_eq!(resp.body["workers"]["active"], 2);
    assert_eq!(resp.body["workers"]["ids"], json!(["worker-a", "worker-b"]));
}

#[tokio::test]
async fn test_redis_health_reports_outage() {
    let fixture = TestFixture::new().await;
    fixture.heartbeats.set_failing(true);

    let resp = fixture.get("/health/redis").await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.body["status"], "unhealthy");
    assert!(resp.body["error"].is_string());
}

#[tokio::test]
async fn test_db_health() {
    let fixture = TestFixture::new().await;
    let resp = fixture.get("/health/db").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "healthy");
    assert!(resp.body["version"].as_str().unwrap().starts_with("SQLite"));
}

#[tokio::test]
async fn test_readiness_all_healthy() {
    let fixture = TestFixture::new().await;
    let resp = fixture.get("/health/ready").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.body,
        json!({
            "status": "healthy",
            "checks": {"api": "healthy", "database": "healthy", "redis": "healthy"}
        })
    );
}

#[tokio::test]
async fn test_readiness_degraded_when_redis_down() {
    let fixture = TestFixture::new().await;
    fixture.heartbeats.set_failing(true);

    let resp = fixture.get("/health/ready").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "degraded");
    assert_eq!(resp.body["checks"]["database"], "healthy");
    assert!(resp.body["checks"]["redis"]
        .as_str()
        .unwrap()
        .starts_with("unhealthy:"));
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let resp = fixture.get("/api/config").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["worker"]["max_tries"].is_number());
    let url = resp.body["redis"]["url"].as_str().unwrap();
    assert!(url.starts_with("redis://"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/health").await;

    let resp = fixture.get_raw("/metrics", &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.header("content-type").unwrap().starts_with("text/plain"));
    let text = String::from_utf8(resp.bytes).unwrap();
    assert!(text.contains("vidkeep_http_requests_total"));
}

#[tokio::test]
async fn test_metrics_reports_videos_by_status() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete("dQw4w9WgXcQ", b"media");

    let resp = fixture.get_raw("/metrics", &[]).await;
    let text = String::from_utf8(resp.bytes).unwrap();
    assert!(text.contains("vidkeep_videos_by_status"));
    assert!(text.contains("vidkeep_videos_by_status{status=\"complete\"}"));
}

// ============================================================================
// Ingest
// ============================================================================

#[tokio::test]
async fn test_ingest_rejects_bad_urls() {
    let fixture = TestFixture::new().await;

    let resp = fixture.post("/api/videos/ingest", json!({"url": "  "})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "URL is required");

    let resp = fixture
        .post("/api/videos/ingest", json!({"url": "https://vimeo.com/123"}))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "Invalid YouTube URL format");

    assert!(fixture.queue.history().is_empty());
}

#[tokio::test]
async fn test_ingest_new_video_queues_job() {
    let fixture = TestFixture::new().await;

    let resp = fixture.post("/api/videos/ingest", json!({"url": URL})).await;
    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert_eq!(resp.body["video_id"], ID);
    assert_eq!(resp.body["message"], "Video queued for download");

    let record = fixture.store.get(ID).unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Pending);
    assert_eq!(record.title, format!("Video {}", ID));
    assert_eq!(record.channel_name, "Test Channel");

    let jobs = fixture.queue.pending();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].video_id, ID);
    assert_eq!(jobs[0].source_url, URL);
    assert_eq!(jobs[0].attempt, 1);
}

#[tokio::test]
async fn test_ingest_accepts_short_link() {
    let fixture = TestFixture::new().await;
    let resp = fixture
        .post("/api/videos/ingest", json!({"url": "https://youtu.be/dQw4w9WgXcQ"}))
        .await;
    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert_eq!(resp.body["video_id"], ID);
}

#[tokio::test]
async fn test_ingest_duplicate_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/videos/ingest", json!({"url": URL})).await;

    let resp = fixture.post("/api/videos/ingest", json!({"url": URL})).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.body["error"], "Video already exists with status: pending");
    assert_eq!(fixture.queue.history().len(), 1);
}

#[tokio::test]
async fn test_ingest_retries_failed_video() {
    let fixture = TestFixture::new().await;
    fixture.store.create(fixtures::new_video(ID)).unwrap();
    fixture.store.begin_download(ID).unwrap();
    fixture.store.fail(ID, "network down").unwrap();

    let resp = fixture.post("/api/videos/ingest", json!({"url": URL})).await;
    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert_eq!(resp.body["message"], "Video retry queued for download");

    let record = fixture.store.get(ID).unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Pending);
    assert!(record.error_message.is_none());
    assert_eq!(fixture.queue.pending().len(), 1);
}

#[tokio::test]
async fn test_ingest_retry_clears_stale_cancel_signal() {
    use vidkeep_core::CancelSignals;

    let fixture = TestFixture::new().await;
    fixture.store.create(fixtures::new_video(ID)).unwrap();
    fixture.store.cancel(ID, "Download cancelled by user").unwrap();
    fixture.signals.request(ID).await.unwrap();

    let resp = fixture.post("/api/videos/ingest", json!({"url": URL})).await;
    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert!(!fixture.signals.consume(ID).await.unwrap());
}

#[tokio::test]
async fn test_ingest_probe_failure() {
    let extractor = MockExtractor::new();
    extractor.set_probe_error("Video unavailable");
    let fixture = TestFixture::with_extractor(extractor).await;

    let resp = fixture.post("/api/videos/ingest", json!({"url": URL})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let error = resp.body["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to fetch video metadata:"));
    assert!(error.contains("Video unavailable"));

    assert!(fixture.store.get(ID).unwrap().is_none());
    assert!(fixture.queue.history().is_empty());
}

// ============================================================================
// Cancel
// ============================================================================

#[tokio::test]
async fn test_cancel_pending_video() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/videos/ingest", json!({"url": URL})).await;

    let resp = fixture.post_empty(&format!("/api/videos/{}/cancel", ID)).await;
    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert_eq!(resp.body["message"], "Cancellation requested");

    let resp = fixture.post_empty(&format!("/api/videos/{}/cancel", ID)).await;
    assert_eq!(resp.status, StatusCode::ACCEPTED);
    assert_eq!(resp.body["message"], "Cancellation already requested");

    // The record only changes when the worker reaches a checkpoint.
    let record = fixture.store.get(ID).unwrap().unwrap();
    assert_eq!(record.status, VideoStatus::Pending);
}

#[tokio::test]
async fn test_cancel_complete_video_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, b"done");

    let resp = fixture.post_empty(&format!("/api/videos/{}/cancel", ID)).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(fixture.signals.consumed_count(ID), 0);
}

#[tokio::test]
async fn test_cancel_unknown_video() {
    let fixture = TestFixture::new().await;
    let resp = fixture.post_empty("/api/videos/aaaaaaaaaaa/cancel").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Lookup and update
// ============================================================================

#[tokio::test]
async fn test_get_video() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, b"0123456789");

    let resp = fixture.get(&format!("/api/videos/{}", ID)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["video_id"], ID);
    assert_eq!(resp.body["status"], "complete");
    assert_eq!(resp.body["file_size_bytes"], 10);
    assert_eq!(resp.body["is_favorite"], false);
    assert_eq!(resp.body["youtube_url"], URL);

    let resp = fixture.get("/api/videos/aaaaaaaaaaa").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_favorite() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, b"x");

    let resp = fixture
        .patch(&format!("/api/videos/{}", ID), json!({"is_favorite": true}))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["is_favorite"], true);
    assert!(fixture.store.get(ID).unwrap().unwrap().is_favorite);

    let resp = fixture
        .patch("/api/videos/aaaaaaaaaaa", json!({"is_favorite": true}))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Queue
// ============================================================================

#[tokio::test]
async fn test_queue_status_counts_pending_jobs() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/api/queue/status").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!({"pending": 0, "processing": 0, "total": 0}));

    fixture.post("/api/videos/ingest", json!({"url": URL})).await;
    fixture
        .post(
            "/api/videos/ingest",
            json!({"url": "https://youtu.be/9bZkp7q19f0"}),
        )
        .await;

    let resp = fixture.get("/api/queue/status").await;
    assert_eq!(resp.body["pending"], 2);
    assert_eq!(resp.body["total"], 2);
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn test_stream_full_file() {
    let fixture = TestFixture::new().await;
    let bytes = media(1000);
    fixture.seed_complete(ID, &bytes);

    let resp = fixture.get_raw(&format!("/api/stream/{}", ID), &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("video/mp4"));
    assert_eq!(resp.header("accept-ranges"), Some("bytes"));
    assert_eq!(resp.header("content-length"), Some("1000"));
    assert!(resp.header("content-range").is_none());
    assert_eq!(resp.bytes, bytes);
}

#[tokio::test]
async fn test_stream_range_forms() {
    let fixture = TestFixture::new().await;
    let bytes = media(1000);
    fixture.seed_complete(ID, &bytes);
    let path = format!("/api/stream/{}", ID);

    let cases = [
        ("bytes=0-99", 0usize, 99usize),
        ("bytes=-100", 900, 999),
        ("bytes=500-", 500, 999),
        ("bytes=990-5000", 990, 999),
    ];
    for (range, start, end) in cases {
        let resp = fixture.get_raw(&path, &[("range", range)]).await;
        assert_eq!(resp.status, StatusCode::PARTIAL_CONTENT, "{}", range);
        let expected = format!("bytes {}-{}/1000", start, end);
        assert_eq!(resp.header("content-range"), Some(expected.as_str()), "{}", range);
        let length = (end - start + 1).to_string();
        assert_eq!(resp.header("content-length"), Some(length.as_str()), "{}", range);
        assert_eq!(resp.bytes, &bytes[start..=end], "{}", range);
    }
}

#[tokio::test]
async fn test_stream_unsatisfiable_range() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, &media(1000));

    let path = format!("/api/stream/{}", ID);

    for range in ["bytes=abc-", "items=0-10", "bytes=0-1,5-9"] {
        let resp = fixture.get_raw(&path, &[("range", range)]).await;
        assert_eq!(resp.status, StatusCode::RANGE_NOT_SATISFIABLE, "{}", range);
        assert_eq!(resp.header("content-range"), Some("bytes */1000"), "{}", range);
    }

    // A start past the end is clamped to the last byte.
    let resp = fixture.get_raw(&path, &[("range", "bytes=5000-")]).await;
    assert_eq!(resp.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.header("content-range"), Some("bytes 999-999/1000"));
}

#[tokio::test]
async fn test_stream_requires_complete_video() {
    let fixture = TestFixture::new().await;
    fixture.store.create(fixtures::new_video(ID)).unwrap();

    let resp = fixture.get_raw(&format!("/api/stream/{}", ID), &[]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = fixture.get_raw("/api/stream/aaaaaaaaaaa", &[]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_missing_file() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, b"abc");
    std::fs::remove_file(fixture.layout.video_path(ID)).unwrap();

    let resp = fixture.get_raw(&format!("/api/stream/{}", ID), &[]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Thumbnails
// ============================================================================

#[tokio::test]
async fn test_thumbnail_placeholder_fallback() {
    let fixture = TestFixture::new().await;
    fixture.store.create(fixtures::new_video(ID)).unwrap();

    let resp = fixture.get_raw(&format!("/api/thumbnail/{}", ID), &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("image/svg+xml"));
    assert_eq!(resp.header("cache-control"), Some("public, max-age=3600"));
    assert!(String::from_utf8(resp.bytes).unwrap().contains("<svg"));

    let resp = fixture
        .get_raw(&format!("/api/thumbnail/{}?fallback=false", ID), &[])
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thumbnail_serves_stored_image() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, b"x");
    std::fs::write(fixture.layout.thumbnail_path(ID), b"\xff\xd8\xffjpeg").unwrap();

    let resp = fixture.get_raw(&format!("/api/thumbnail/{}", ID), &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("image/jpeg"));
    assert_eq!(resp.header("cache-control"), Some("public, max-age=86400"));
    assert_eq!(
        resp.header("content-disposition"),
        Some("inline; filename=\"dQw4w9WgXcQ.jpg\"")
    );
    assert_eq!(resp.bytes, b"\xff\xd8\xffjpeg");
}

#[tokio::test]
async fn test_thumbnail_keeps_source_extension() {
    let fixture = TestFixture::new().await;
    fixture.seed_complete(ID, b"x");
    std::fs::write(
        fixture.layout.videos_dir.join(format!("{}.webp", ID)),
        b"RIFFwebp",
    )
    .unwrap();

    let resp = fixture.get_raw(&format!("/api/thumbnail/{}", ID), &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("content-type"), Some("image/webp"));
    assert_eq!(
        resp.header("content-disposition"),
        Some("inline; filename=\"dQw4w9WgXcQ.webp\"")
    );
}

#[tokio::test]
async fn test_thumbnail_unknown_video() {
    let fixture = TestFixture::new().await;
    let resp = fixture.get_raw("/api/thumbnail/aaaaaaaaaaa", &[]).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
