//! Orchestrator configuration.

use std::time::Duration;

use crate::config::WorkerConfig;

/// Timing knobs for a single download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Minimum spacing between cancellation checks during a transfer.
    pub cancel_check_interval: Duration,
    /// Wall-clock limit for one attempt.
    pub job_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for OrchestratorConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            cancel_check_interval: config.cancel_check_interval(),
            job_timeout: config.job_timeout(),
        }
    }
}
