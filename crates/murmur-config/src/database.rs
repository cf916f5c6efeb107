// ============================================================================
// Database Configuration
// ============================================================================
//
// Only read when STORE_BACKEND=postgres.
// ============================================================================

use crate::constants::{
    DEFAULT_DB_ACQUIRE_TIMEOUT_SECS, DEFAULT_DB_IDLE_TIMEOUT_SECS, DEFAULT_DB_MAX_CONNECTIONS,
    DEFAULT_DB_MIN_CONNECTIONS,
};
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl DbConfig {
    pub(crate) fn from_env() -> Self {
        let max_connections = env_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS).max(1);
        Self {
            max_connections,
            min_connections: env_or("DB_MIN_CONNECTIONS", DEFAULT_DB_MIN_CONNECTIONS)
                .min(max_connections),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", DEFAULT_DB_IDLE_TIMEOUT_SECS),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            min_connections: DEFAULT_DB_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_DB_IDLE_TIMEOUT_SECS,
        }
    }
}
