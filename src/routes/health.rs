// ============================================================================
// Health and Metrics Routes
// ============================================================================
//
// Endpoints:
// - GET /health       - store reachable
// - GET /health/live  - process is up
// - GET /health/ready - store reachable, with session stats
// - GET /metrics      - Prometheus metrics
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use murmur_db::Store;
use murmur_error::AppError;
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;

/// GET /health
pub async fn health_check(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    if let Err(e) = ctx.store.ping().await {
        tracing::error!(error = %e, backend = ctx.store.backend_name(), "Health check failed");
        return (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable");
    }
    (StatusCode::OK, "OK")
}

/// GET /health/live
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /health/ready
pub async fn readiness_check(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let store_ok = match ctx.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check: store unreachable");
            false
        }
    };
    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if store_ok { "ready" } else { "not_ready" },
            "store": ctx.store.backend_name(),
            "sessions": ctx.registry.session_count().await,
        })),
    )
}

/// GET /metrics
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    let body = murmur_metrics::gather_metrics()
        .map_err(|e| AppError::internal(format!("failed to gather metrics: {}", e)))?;
    Ok((
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        body,
    ))
}
