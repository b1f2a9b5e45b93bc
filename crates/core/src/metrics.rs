//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download jobs (outcomes, retries, duration)
//! - Progress publishing
//! - Worker heartbeats
//! - Live-update fan-out

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Download Jobs
// =============================================================================

/// Finished jobs by outcome.
pub static JOB_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidkeep_job_outcomes_total", "Finished download jobs"),
        &["outcome"], // "completed", "cancelled", "failed", "timed_out"
    )
    .unwrap()
});

/// Job attempts pushed back onto the queue after a failure.
pub static JOB_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("vidkeep_job_retries_total", "Download jobs re-queued after failure").unwrap()
});

/// Wall-clock duration of a job attempt.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("vidkeep_job_duration_seconds", "Duration of a download attempt")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Progress
// =============================================================================

/// Progress events handed to the progress channel.
pub static PROGRESS_EVENTS_PUBLISHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vidkeep_progress_events_published_total",
        "Progress events published",
    )
    .unwrap()
});

/// Progress events that could not be published.
pub static PROGRESS_PUBLISH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vidkeep_progress_publish_failures_total",
        "Progress events dropped because publishing failed",
    )
    .unwrap()
});

// =============================================================================
// Liveness
// =============================================================================

/// Heartbeat writes by result.
pub static HEARTBEAT_WRITES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vidkeep_heartbeat_writes_total", "Worker heartbeat writes"),
        &["result"], // "ok", "error"
    )
    .unwrap()
});

// =============================================================================
// Fan-out
// =============================================================================

/// Live-update sessions currently registered.
pub static FANOUT_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("vidkeep_ws_sessions_active", "Connected live-update sessions").unwrap()
});

/// Live-update sessions ever registered.
pub static FANOUT_SESSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("vidkeep_ws_sessions_total", "Live-update sessions opened").unwrap()
});

/// Messages handed to sessions.
pub static FANOUT_MESSAGES_RELAYED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vidkeep_ws_messages_relayed_total",
        "Progress messages delivered to live-update sessions",
    )
    .unwrap()
});

/// Sessions removed because delivery to them failed.
pub static FANOUT_SESSIONS_PRUNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vidkeep_ws_sessions_pruned_total",
        "Live-update sessions dropped after a failed delivery",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOB_OUTCOMES.clone()),
        Box::new(JOB_RETRIES.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(PROGRESS_EVENTS_PUBLISHED.clone()),
        Box::new(PROGRESS_PUBLISH_FAILURES.clone()),
        Box::new(HEARTBEAT_WRITES.clone()),
        Box::new(FANOUT_SESSIONS_ACTIVE.clone()),
        Box::new(FANOUT_SESSIONS_TOTAL.clone()),
        Box::new(FANOUT_MESSAGES_RELAYED.clone()),
        Box::new(FANOUT_SESSIONS_PRUNED.clone()),
    ]
}
