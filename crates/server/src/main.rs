use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info};

use vidkeep_core::{
    CancelSignals, Extractor, HeartbeatStore, JobQueue, MediaLayout, ProgressChannel,
    ProgressRelay, RedisCancelSignals, RedisHeartbeatStore, RedisJobQueue, RedisProgressChannel,
    SessionRegistry, SqliteVideoStore, VideoStore, YtDlpExtractor,
};
use vidkeep_server::api::create_router;
use vidkeep_server::bootstrap::{connect_redis, init_tracing, load, shutdown_signal};
use vidkeep_server::state::AppState;

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
    info!("Video store initialized");

    let (client, conn) = connect_redis(&config.redis.url).await?;
    let signals: Arc<dyn CancelSignals> = Arc::new(RedisCancelSignals::new(conn.clone()));
    let progress: Arc<dyn ProgressChannel> =
        Arc::new(RedisProgressChannel::new(client, conn.clone()));
    let heartbeats: Arc<dyn HeartbeatStore> = Arc::new(RedisHeartbeatStore::new(conn.clone()));
    // The API never blocks on the queue, so it shares the connection.
    let queue: Arc<dyn JobQueue> = Arc::new(RedisJobQueue::new(conn));
    let extractor: Arc<dyn Extractor> = Arc::new(YtDlpExtractor::new(&config.extractor));

    // Progress fan-out to WebSocket sessions
    let sessions = SessionRegistry::new();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let relay = tokio::spawn(
        ProgressRelay::new(progress, sessions.clone()).run(shutdown_tx.subscribe()),
    );
    info!("Progress relay started");

    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        signals,
        queue,
        extractor,
        heartbeats,
        layout,
        sessions,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    let _ = shutdown_tx.send(());
    if let Err(e) = relay.await {
        error!("Progress relay ended abnormally: {}", e);
    }
    info!("Progress relay stopped");

    Ok(())
}
