use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, queue, stream, videos, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Videos
        .route("/videos/ingest", post(videos::ingest_video))
        .route(
            "/videos/{id}",
            get(videos::get_video).patch(videos::update_video),
        )
        .route("/videos/{id}/cancel", post(videos::cancel_video))
        // Media
        .route("/stream/{id}", get(stream::stream_video))
        .route("/thumbnail/{id}", get(stream::get_thumbnail))
        // Queue
        .route("/queue/status", get(queue::queue_status))
        .route("/config", get(handlers::get_config));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health))
        .route("/health/ready", get(handlers::readiness))
        .route("/health/db", get(handlers::db_health))
        .route("/health/redis", get(handlers::redis_health))
        .route("/metrics", get(handlers::metrics))
        .route("/ws/progress", get(ws::ws_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
