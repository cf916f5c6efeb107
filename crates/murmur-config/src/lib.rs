// ============================================================================
// Murmur Config - Centralized configuration management
// ============================================================================
//
// Loads configuration from environment variables (and an optional .env
// file) with sensible defaults.
//
// ============================================================================

mod constants;
mod database;
mod logging;
mod realtime;

// Re-export all public types
pub use constants::{
    MAX_COMMENT_LENGTH, MAX_FRAME_SIZE, MAX_MESSAGE_LENGTH, MAX_NOTIFICATION_CONTENT_LENGTH,
    MAX_PAGE_SIZE,
};
pub use database::DbConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use realtime::RealtimeConfig;

use anyhow::Result;
use constants::*;

/// Where durable state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; state is lost on restart
    Memory,
    /// PostgreSQL via DATABASE_URL
    Postgres,
}

impl StoreBackend {
    fn from_env() -> Self {
        let raw = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase();

        match raw.as_str() {
            "memory" | "mem" | "inmemory" => StoreBackend::Memory,
            "postgres" | "postgresql" | "pg" => StoreBackend::Postgres,
            _ => {
                tracing::warn!(
                    backend = %raw,
                    "Unknown STORE_BACKEND, defaulting to 'postgres'"
                );
                StoreBackend::Postgres
            }
        }
    }
}

/// Main configuration structure
#[derive(Clone, Debug)]
pub struct Config {
    /// Required only for the Postgres backend
    pub database_url: Option<String>,
    pub port: u16,
    pub bind_address: String,
    pub rust_log: String,
    pub store_backend: StoreBackend,

    // Sub-configurations
    pub logging: LoggingConfig,
    pub db: DbConfig,
    pub realtime: RealtimeConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let logging = LoggingConfig::from_env()?;
        let db = DbConfig::from_env();
        let realtime = RealtimeConfig::from_env();
        let store_backend = StoreBackend::from_env();

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND is postgres");
        }

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            database_url,
            port,
            bind_address: format!("0.0.0.0:{}", port),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            store_backend,
            logging,
            db,
            realtime,
        })
    }

    /// Configuration for an in-memory instance, used by tests and local runs
    pub fn in_memory(hash_salt: &str) -> Self {
        Self {
            database_url: None,
            port: 0,
            bind_address: "127.0.0.1:0".to_string(),
            rust_log: "info".to_string(),
            store_backend: StoreBackend::Memory,
            logging: LoggingConfig {
                enable_user_identifiers: false,
                hash_salt: hash_salt.to_string(),
                format: LogFormat::Text,
            },
            db: DbConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}
