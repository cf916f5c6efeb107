// ============================================================================
// WebSocket session lifecycle
// ============================================================================
//
// One task per connection:
// 1. Register a session (auto-joins the principal's inbox topic)
// 2. Loop: forward registry events to the socket, dispatch client frames
// 3. On close or error, unregister; every topic membership goes with it
//
// The session lock inside the registry is only held for the membership
// change itself; message persistence and notifications never run under it.
// ============================================================================

mod connection;
mod messages;
mod topics;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::StreamExt;
use murmur_types::{ClientFrame, EventEnvelope, PrincipalId, ServerFrame, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::context::AppContext;
use crate::utils::principal_label;
use connection::ConnectionHandler;

pub async fn handle_websocket(socket: WebSocket, principal_id: PrincipalId, ctx: Arc<AppContext>) {
    let session_id = Uuid::new_v4();
    let user = principal_label(&principal_id, &ctx.config.logging);
    let span = tracing::info_span!("websocket_session", session_id = %session_id, user = %user);

    run_session(socket, session_id, principal_id, ctx)
        .instrument(span)
        .await;
}

async fn run_session(
    socket: WebSocket,
    session_id: SessionId,
    principal_id: PrincipalId,
    ctx: Arc<AppContext>,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<EventEnvelope>>();
    let mut handler = ConnectionHandler::new(ws_sender, session_id, principal_id);

    if let Err(e) = ctx.registry.register(session_id, principal_id, tx).await {
        handler.send_app_error(&e).await;
        handler.close().await;
        return;
    }
    tracing::info!("Session registered");

    loop {
        tokio::select! {
            Some(envelope) = rx.recv() => {
                let frame = ServerFrame::Event((*envelope).clone());
                if let Err(e) = handler.send_frame(&frame).await {
                    tracing::debug!(error = %e, "Failed to push event, closing session");
                    break;
                }
            }
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => dispatch(&mut handler, &ctx, frame).await,
                            Err(e) => {
                                tracing::debug!(error = %e, "Malformed client frame");
                                handler
                                    .send_error("VALIDATION_ERROR", "Malformed frame")
                                    .await;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        handler
                            .send_error("VALIDATION_ERROR", "Binary frames are not supported")
                            .await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::info!("Client closed connection");
                        break;
                    }
                    // Ping/Pong are answered by the transport
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    ctx.registry.unregister(session_id).await;
    tracing::info!("Session unregistered");
}

async fn dispatch(handler: &mut ConnectionHandler, ctx: &AppContext, frame: ClientFrame) {
    tracing::trace!(frame = frame.kind(), "Client frame");
    match frame {
        ClientFrame::Subscribe { topic } => topics::handle_subscribe(handler, ctx, topic).await,
        ClientFrame::Unsubscribe { topic } => {
            topics::handle_unsubscribe(handler, ctx, topic).await
        }
        ClientFrame::SendMessage {
            to_user_id,
            content,
        } => messages::handle_send_message(handler, ctx, to_user_id, content).await,
        ClientFrame::SeenMessage { conversation_id } => {
            messages::handle_seen_message(handler, ctx, conversation_id).await
        }
        ClientFrame::Typing { to_user_id } => {
            messages::handle_typing(handler, ctx, to_user_id).await
        }
        ClientFrame::Ping => {
            if let Err(e) = handler.send_frame(&ServerFrame::Pong).await {
                tracing::debug!(error = %e, "Failed to send pong");
            }
        }
    }
}
