use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};
use murmur_config::MAX_FRAME_SIZE;
use std::sync::Arc;

use crate::context::AppContext;
use crate::handlers::handle_websocket;
use crate::routes::extractors::TrustedUser;

/// GET /ws
/// Upgrade to a real-time session for the gateway-authenticated principal
pub async fn upgrade(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(principal_id): TrustedUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| handle_websocket(socket, principal_id, ctx))
}
