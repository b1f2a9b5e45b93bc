//! Worker integration tests: queue consumption, retries and heartbeats.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use vidkeep_core::{
    testing::{
        fixtures, MemoryCancelSignals, MemoryHeartbeatStore, MemoryJobQueue,
        MemoryProgressChannel, MockExtractor, ScriptedOutcome,
    },
    DownloadOrchestrator, FsThumbnailProcessor, HeartbeatStore, Job, JobQueue, MediaLayout,
    OrchestratorConfig, QueueStatus, RetryPolicy, SqliteVideoStore, VideoStatus, VideoStore,
    Worker, WorkerHeartbeat,
};

const ID: &str = "dQw4w9WgXcQ";
const URL: &str = "https://youtu.be/dQw4w9WgXcQ";

struct TestHarness {
    store: Arc<SqliteVideoStore>,
    queue: Arc<MemoryJobQueue>,
    extractor: Arc<MockExtractor>,
    layout: MediaLayout,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(extractor: MockExtractor) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let layout = MediaLayout::new(temp_dir.path());
        layout.ensure_dirs().unwrap();

        Self {
            store: Arc::new(SqliteVideoStore::in_memory().unwrap()),
            queue: Arc::new(MemoryJobQueue::new()),
            extractor: Arc::new(extractor),
            layout,
            _temp_dir: temp_dir,
        }
    }

    fn worker(&self, max_tries: u32) -> Worker {
        let orchestrator = DownloadOrchestrator::new(
            OrchestratorConfig {
                cancel_check_interval: Duration::ZERO,
                job_timeout: Duration::from_secs(30),
            },
            self.store.clone(),
            Arc::new(MemoryCancelSignals::new()),
            Arc::new(MemoryProgressChannel::new()),
            self.extractor.clone(),
            Arc::new(FsThumbnailProcessor::new(self.layout.clone())),
            self.layout.clone(),
        );
        let policy = RetryPolicy {
            max_tries,
            ..Default::default()
        };
        Worker::new(
            self.queue.clone(),
            self.store.clone(),
            Arc::new(orchestrator),
            policy,
            2,
            Duration::from_millis(20),
        )
    }

    fn status(&self) -> VideoStatus {
        self.store.get(ID).unwrap().unwrap().status
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_attempts_are_retried_until_success() {
    let harness = TestHarness::new(
        MockExtractor::new()
            .then(ScriptedOutcome::Fail("HTTP Error 503".into()))
            .then(ScriptedOutcome::Fail("HTTP Error 503".into())),
    );
    harness.store.create(fixtures::new_video(ID)).unwrap();
    harness.queue.enqueue(ID, URL).await.unwrap();

    let worker = harness.worker(3);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let running = tokio::spawn(async move { worker.run(shutdown_rx).await });

    for _ in 0..500 {
        if harness.status() == VideoStatus::Complete {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(harness.status(), VideoStatus::Complete);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("worker should stop")
        .unwrap();

    assert_eq!(harness.extractor.download_calls(), 3);
    let history = harness.queue.history();
    let attempts: Vec<u32> = history.iter().map(|j| j.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(history.iter().all(|j| j.job_id == history[0].job_id));
    assert_eq!(harness.queue.status().await.unwrap(), QueueStatus::new(0, 0));
    assert!(harness.store.get(ID).unwrap().unwrap().error_message.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_attempt_ceiling_leaves_video_failed() {
    let harness = TestHarness::new(
        MockExtractor::new().always(ScriptedOutcome::Fail("ERROR: Private video".into())),
    );
    harness.store.create(fixtures::new_video(ID)).unwrap();
    let worker = harness.worker(2);

    worker.process(Job::new(ID, URL)).await;
    assert_eq!(harness.status(), VideoStatus::Pending);
    let retry = harness
        .queue
        .dequeue(Duration::from_millis(10))
        .await
        .unwrap()
        .expect("first failure should be re-queued");
    assert_eq!(retry.attempt, 2);

    worker.process(retry).await;
    assert_eq!(harness.status(), VideoStatus::Failed);
    assert!(harness.queue.pending().is_empty());
    assert_eq!(harness.extractor.download_calls(), 2);
    assert_eq!(
        harness.store.get(ID).unwrap().unwrap().error_message.as_deref(),
        Some("ERROR: Private video")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unstartable_job_is_not_retried() {
    let harness = TestHarness::new(MockExtractor::new());
    let worker = harness.worker(3);

    worker.process(Job::new("missing0000", "https://youtu.be/missing0000")).await;

    assert!(harness.queue.history().is_empty());
    assert_eq!(harness.extractor.download_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_idle_worker_stops_on_shutdown() {
    let harness = TestHarness::new(MockExtractor::new());
    let worker = harness.worker(3);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let running = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("worker should stop")
        .unwrap();
}

#[tokio::test]
async fn test_heartbeat_expires_without_refresh() {
    let store = Arc::new(MemoryHeartbeatStore::new());
    store.beat("w1", Duration::from_millis(50)).await.unwrap();
    assert_eq!(store.live_workers().await.unwrap(), vec!["w1".to_string()]);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(store.live_workers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_heartbeat_refreshes_and_stop_removes_key() {
    let store = Arc::new(MemoryHeartbeatStore::new());
    let heartbeat = WorkerHeartbeat::start(
        store.clone(),
        "worker-1".to_string(),
        Duration::from_millis(100),
        Duration::from_millis(20),
    )
    .await
    .unwrap();
    assert_eq!(heartbeat.worker_id(), "worker-1");

    // Outlive the TTL several times over; refreshes keep the key alive.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(store.is_live("worker-1"));
    assert!(store.beat_count("worker-1") >= 3);

    heartbeat.stop().await.unwrap();
    assert!(!store.is_live("worker-1"));
    assert!(store.live_workers().await.unwrap().is_empty());
}
