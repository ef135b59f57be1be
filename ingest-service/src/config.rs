use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ingest service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Quiet window after the last clock-out before a queued recompute
    /// becomes due, in seconds
    pub recompute_debounce_secs: u64,

    /// Recompute worker poll interval in milliseconds
    pub worker_tick_ms: u64,

    /// Finished jobs older than this are evicted, in seconds
    pub job_retention_secs: u64,

    /// Service version
    pub version: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recompute_debounce_secs: 30,
            worker_tick_ms: 500,
            job_retention_secs: 3600,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl IngestConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secs) = std::env::var("RECOMPUTE_DEBOUNCE_SECS") {
            if let Ok(n) = secs.parse() {
                config.recompute_debounce_secs = n;
            }
        }

        if let Ok(ms) = std::env::var("WORKER_TICK_MS") {
            if let Ok(n) = ms.parse() {
                config.worker_tick_ms = n;
            }
        }

        if let Ok(secs) = std::env::var("JOB_RETENTION_SECS") {
            if let Ok(n) = secs.parse() {
                config.job_retention_secs = n;
            }
        }

        config
    }

    /// Get the debounce window as Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.recompute_debounce_secs)
    }

    /// Get the worker tick as Duration
    pub fn worker_tick(&self) -> Duration {
        Duration::from_millis(self.worker_tick_ms)
    }

    /// Get the job retention window as Duration
    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.recompute_debounce_secs, 30);
        assert_eq!(config.worker_tick_ms, 500);
        assert_eq!(config.debounce(), Duration::from_secs(30));
    }
}
