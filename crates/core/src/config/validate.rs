use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker has at least one slot and one attempt
/// - Heartbeat refreshes before its TTL runs out
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.worker.max_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "worker.max_jobs must be at least 1".to_string(),
        ));
    }

    if config.worker.max_tries == 0 {
        return Err(ConfigError::ValidationError(
            "worker.max_tries must be at least 1".to_string(),
        ));
    }

    if config.worker.heartbeat_interval_secs >= config.worker.heartbeat_ttl_secs {
        return Err(ConfigError::ValidationError(format!(
            "worker.heartbeat_interval_secs ({}) must be shorter than worker.heartbeat_ttl_secs ({})",
            config.worker.heartbeat_interval_secs, config.worker.heartbeat_ttl_secs
        )));
    }

    Ok(())
}
