// ============================================================================
// TrustedUser Extractor
// ============================================================================
//
// The principal id arrives in the X-User-Id header, set by the gateway after
// it has verified the caller's credentials. This service never sees tokens.
//
// SECURITY: the header is trusted unconditionally, so the service must only
// be reachable through the gateway.
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use murmur_types::PrincipalId;
use serde_json::json;

/// Principal propagated from the gateway via the X-User-Id header
#[derive(Debug, Clone, Copy)]
pub struct TrustedUser(pub PrincipalId);

/// Header name for principal propagation
pub const USER_ID_HEADER: &str = "x-user-id";

#[async_trait]
impl<S> FromRequestParts<S> for TrustedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let principal = murmur_types::parse_id("principal", raw).map_err(|e| {
            tracing::warn!(error = %e, "Missing or invalid X-User-Id header");
            let body = json!({
                "error": "Authentication required",
                "error_code": "AUTH_REQUIRED",
            });
            (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
        })?;

        tracing::trace!("TrustedUser extracted from header");
        Ok(TrustedUser(principal))
    }
}
