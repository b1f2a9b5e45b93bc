use std::sync::Arc;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use vidkeep_core::heartbeat::generate_worker_id;
use vidkeep_core::{
    DownloadOrchestrator, FsThumbnailProcessor, MediaLayout, OrchestratorConfig,
    RedisCancelSignals, RedisHeartbeatStore, RedisJobQueue, RedisProgressChannel, RetryPolicy,
    SqliteVideoStore, VideoStore, Worker, WorkerHeartbeat, YtDlpExtractor,
};
use vidkeep_server::bootstrap::{connect_redis, init_tracing, load, shutdown_signal};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_tracing();
    let config = load()?;

    let layout = MediaLayout::new(&config.storage.data_path);
    layout
        .ensure_dirs()
        .with_context(|| format!("Failed to create media directories under {:?}", config.storage.data_path))?;

    let store: Arc<dyn VideoStore> = Arc::new(
        SqliteVideoStore::new(&config.database.path).context("Failed to open video store")?,
    );

    let (client, conn) = connect_redis(&config.redis.url).await?;
    // BRPOP holds its connection for the whole wait; keep it off the shared one.
    let queue_conn = ConnectionManager::new(client.clone())
        .await
        .context("Failed to open queue connection")?;

    let orchestrator = DownloadOrchestrator::new(
        OrchestratorConfig::from(&config.worker),
        Arc::clone(&store),
        Arc::new(RedisCancelSignals::new(conn.clone())),
        Arc::new(RedisProgressChannel::new(client, conn.clone())),
        Arc::new(YtDlpExtractor::new(&config.extractor)),
        Arc::new(FsThumbnailProcessor::new(layout.clone())),
        layout,
    );

    let worker = Worker::new(
        Arc::new(RedisJobQueue::new(queue_conn)),
        store,
        Arc::new(orchestrator),
        RetryPolicy::from(&config.worker),
        config.worker.max_jobs,
        config.worker.dequeue_timeout(),
    );

    let worker_id = generate_worker_id();
    let heartbeat = WorkerHeartbeat::start(
        Arc::new(RedisHeartbeatStore::new(conn)),
        worker_id.clone(),
        config.worker.heartbeat_ttl(),
        config.worker.heartbeat_interval(),
    )
    .await
    .context("Failed to register worker heartbeat")?;
    info!(worker_id = %worker_id, max_jobs = config.worker.max_jobs, "Worker registered");

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let running = tokio::spawn(async move { worker.run(shutdown_rx).await });

    shutdown_signal().await;
    info!(worker_id = %worker_id, "Shutdown requested");
    let _ = shutdown_tx.send(());
    if let Err(e) = running.await {
        error!(worker_id = %worker_id, error = %e, "Worker loop ended abnormally");
    }

    if let Err(e) = heartbeat.stop().await {
        warn!(worker_id = %worker_id, error = %e, "Failed to remove heartbeat");
    }
    info!(worker_id = %worker_id, "Worker exited");
    Ok(())
}
