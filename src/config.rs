//! Engine configuration.
//!
//! Defaults cover local development; every field can be overridden through
//! `STRATUS_`-prefixed environment variables (e.g. `STRATUS_DATABASE_URL`,
//! `STRATUS_DISPATCH_BATCH_SIZE`).

use crate::error::{Result, StratusError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Postgres connection string for the backing store
    pub database_url: String,
    /// Maximum number of ready node ids handed to the dispatcher per discovery pass
    pub dispatch_batch_size: usize,
    /// Dispatcher re-poll interval for RUNNING_WAIT nodes, in milliseconds
    pub wait_repoll_interval_ms: u64,
    /// Interval between marked-for-deletion sweeps, in seconds
    pub sweep_interval_secs: u64,
    /// Lease TTL for globally exclusive jobs, in seconds
    pub exclusive_lock_ttl_secs: u64,
    /// Maximum attempts for the remote-shell retry flow
    pub shell_max_attempts: u32,
    /// Base backoff between shell retry attempts, in milliseconds
    pub shell_backoff_base_ms: u64,
    /// Backoff ceiling for shell retries, in milliseconds
    pub shell_backoff_max_ms: u64,
    /// Event channel capacity
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/stratus_development".to_string(),
            dispatch_batch_size: 50,
            wait_repoll_interval_ms: 5000,
            sweep_interval_secs: 300,
            exclusive_lock_ttl_secs: 600,
            shell_max_attempts: 3,
            shell_backoff_base_ms: 1000,
            shell_backoff_max_ms: 60000,
            event_capacity: 1000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("STRATUS"))
            .build()
            .map_err(|e| StratusError::Configuration(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| StratusError::Configuration(e.to_string()))
    }
}
