//! Prometheus metrics for the API process.
//!
//! HTTP request metrics live here; job, progress, heartbeat and fan-out
//! metrics come from `vidkeep_core::metrics` and are registered alongside.

use once_cell::sync::Lazy;
use tracing::warn;
use vidkeep_core::VideoStatus;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vidkeep_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidkeep_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vidkeep_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Videos ingested through the API, by result.
pub static INGEST_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidkeep_ingest_requests_total", "Ingest requests by result"),
        &["result"],
    )
    .unwrap()
});

/// Cancellation requests accepted by the API.
pub static CANCEL_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidkeep_cancel_requests_total", "Cancel requests by result"),
        &["result"],
    )
    .unwrap()
});

/// Videos by current status (refreshed on each scrape).
pub static VIDEOS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("vidkeep_videos_by_status", "Current video count by status"),
        &["status"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(INGEST_REQUESTS.clone()))
        .unwrap();
    registry
        .register(Box::new(CANCEL_REQUESTS.clone()))
        .unwrap();
    registry
        .register(Box::new(VIDEOS_BY_STATUS.clone()))
        .unwrap();

    for metric in vidkeep_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges that are read from the video store rather than counted.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    for status in VideoStatus::ALL {
        match state.store().count_by_status(status) {
            Ok(count) => VIDEOS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count),
            Err(e) => warn!(status = status.as_str(), error = %e, "Failed to count videos"),
        }
    }
}

static VIDEO_ID_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/[A-Za-z0-9_-]{11}(/|$)").unwrap());

/// Normalize a path for metric labels (replace video ids with a placeholder).
pub fn normalize_path(path: &str) -> String {
    VIDEO_ID_SEGMENT.replace_all(path, "/{id}$1").to_string()
}
