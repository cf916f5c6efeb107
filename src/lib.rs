// ============================================================================
// Murmur - real-time engagement and messaging core
// ============================================================================
//
// Keeps likes, comments, follows, notifications and direct messages
// consistent under concurrent writers, and pushes every committed change to
// the connected sessions that care about it.
//
// Components:
// - registry:      topics -> live sessions
// - fanout:        topic delivery, notification gate, detached follow-ups
// - conversations: one conversation per unordered principal pair
// - engagement:    likes and comments with denormalized counters
// - follows:       follow graph
// - messages:      direct messages, seen/delivered state, unread counts
// - notifications: notification inbox management
//
// ============================================================================

pub mod context;
pub mod conversations;
pub mod engagement;
pub mod fanout;
pub mod follows;
pub mod handlers;
pub mod messages;
pub mod notifications;
pub mod registry;
pub mod routes;
pub mod utils;

use anyhow::{Context, Result};
use murmur_config::{Config, LogFormat, StoreBackend};
use murmur_db::{MemoryStore, PgStore, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use context::AppContext;

/// Install the global tracing subscriber
pub fn init_tracing(config: &Config) {
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()));

    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Open the configured store, running migrations for Postgres
pub async fn build_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; state is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres store")?;

            tracing::info!("Connecting to database...");
            let pool = murmur_db::create_pool(database_url, &config.db).await?;
            tracing::info!("Connected to database");

            murmur_db::run_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// Serve the router on `listener` until `shutdown` resolves, then drain
/// pending follow-ups
pub async fn serve<F>(listener: TcpListener, ctx: Arc<AppContext>, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = routes::create_router(ctx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server failed")?;

    ctx.fanout.shutdown().await;
    Ok(())
}

/// Full startup: store, context, listener, serve until ctrl-c
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    tracing::info!("=== Murmur Starting ===");
    tracing::info!("Port: {}", config.port);

    let store = build_store(&config).await?;
    let ctx = Arc::new(AppContext::new(config.clone(), store));

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Murmur listening on {}", config.bind_address);

    serve(listener, ctx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
    })
    .await
}
