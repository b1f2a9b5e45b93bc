//! Health, config and metrics handlers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use vidkeep_core::SanitizedConfig;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct WorkersSummary {
    pub active: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<WorkersSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DbHealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub api: String,
    pub database: String,
    pub redis: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

const HEALTHY: &str = "healthy";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Redis reachability plus the workers whose heartbeat is live.
pub async fn redis_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.heartbeats().live_workers().await {
        Ok(ids) => (
            StatusCode::OK,
            Json(RedisHealthResponse {
                status: "healthy".to_string(),
                workers: Some(WorkersSummary {
                    active: ids.len(),
                    ids,
                }),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Redis health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(RedisHealthResponse {
                    status: "unhealthy".to_string(),
                    workers: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Database round-trip.
pub async fn db_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store().ping() {
        Ok(version) => (
            StatusCode::OK,
            Json(DbHealthResponse {
                status: HEALTHY.to_string(),
                version: Some(version),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DbHealthResponse {
                    status: "unhealthy".to_string(),
                    version: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Readiness of every dependency. A failing dependency reports `degraded`
/// rather than an error status, so the body always lists each check.
pub async fn readiness(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let database = match state.store().ping() {
        Ok(_) => HEALTHY.to_string(),
        Err(e) => format!("unhealthy: {}", e),
    };
    let redis = match state.heartbeats().live_workers().await {
        Ok(_) => HEALTHY.to_string(),
        Err(e) => format!("unhealthy: {}", e),
    };

    let all_healthy = database == HEALTHY && redis == HEALTHY;
    if !all_healthy {
        warn!(database = %database, redis = %redis, "Service degraded");
    }

    Json(ReadinessResponse {
        status: if all_healthy { HEALTHY } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            api: HEALTHY.to_string(),
            database,
            redis,
        },
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
