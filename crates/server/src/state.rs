use std::sync::Arc;

use vidkeep_core::{
    CancelSignals, Config, Extractor, HeartbeatStore, JobQueue, MediaLayout, SanitizedConfig,
    SessionRegistry, StreamingEngine, VideoStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn VideoStore>,
    signals: Arc<dyn CancelSignals>,
    queue: Arc<dyn JobQueue>,
    extractor: Arc<dyn Extractor>,
    heartbeats: Arc<dyn HeartbeatStore>,
    layout: MediaLayout,
    streaming: StreamingEngine,
    sessions: SessionRegistry,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        store: Arc<dyn VideoStore>,
        signals: Arc<dyn CancelSignals>,
        queue: Arc<dyn JobQueue>,
        extractor: Arc<dyn Extractor>,
        heartbeats: Arc<dyn HeartbeatStore>,
        layout: MediaLayout,
        sessions: SessionRegistry,
    ) -> Self {
        let streaming = StreamingEngine::new(Arc::clone(&store), layout.clone());
        Self {
            config,
            store,
            signals,
            queue,
            extractor,
            heartbeats,
            layout,
            streaming,
            sessions,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &Arc<dyn VideoStore> {
        &self.store
    }

    pub fn signals(&self) -> &Arc<dyn CancelSignals> {
        &self.signals
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    pub fn extractor(&self) -> &Arc<dyn Extractor> {
        &self.extractor
    }

    pub fn heartbeats(&self) -> &Arc<dyn HeartbeatStore> {
        &self.heartbeats
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    pub fn streaming(&self) -> &StreamingEngine {
        &self.streaming
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}
