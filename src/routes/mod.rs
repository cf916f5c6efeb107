// ============================================================================
// Axum Routes
// ============================================================================
//
// Structure:
// - mod.rs: router assembly and middleware
// - health.rs: health checks and metrics
// - ws.rs: WebSocket upgrade
// - extractors.rs: TrustedUser (gateway-propagated principal)
//
// ============================================================================

pub mod extractors;
mod health;
mod ws;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the application router
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(health::metrics))
        .route("/ws", get(ws::upgrade))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(app_context)
}
