//! # Murmur Database
//!
//! Persistence boundary for the engagement and messaging core.
//!
//! Every durable mutation is a single atomic conditional operation on the
//! store. Two implementations are provided:
//! - [`PgStore`]: PostgreSQL via sqlx, one statement per mutation
//! - [`MemoryStore`]: a single-process store guarded by one `RwLock`

mod error;
pub mod store;
mod traits;

pub use error::{StoreError, StoreResult};
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use traits::{
    ConversationStore, EngagementStore, FollowStore, LikeOutcome, MessageStore,
    NotificationStore, Store,
};

use anyhow::{Context, Result};
use murmur_config::DbConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

/// Database connection pool type
pub type DbPool = Pool<Postgres>;

/// Create a PostgreSQL connection pool
pub async fn create_pool(database_url: &str, db_config: &DbConfig) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(db_config.idle_timeout_secs)))
        .test_before_acquire(true)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tracing::debug!(
        max_connections = db_config.max_connections,
        min_connections = db_config.min_connections,
        "PostgreSQL pool ready"
    );
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
