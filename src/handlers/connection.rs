use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use murmur_error::AppError;
use murmur_types::{PrincipalId, ServerFrame, SessionId};

/// Write half of one client connection plus who it belongs to
pub struct ConnectionHandler {
    ws_sender: SplitSink<WebSocket, WsMessage>,
    session_id: SessionId,
    principal_id: PrincipalId,
}

impl ConnectionHandler {
    pub fn new(
        ws_sender: SplitSink<WebSocket, WsMessage>,
        session_id: SessionId,
        principal_id: PrincipalId,
    ) -> Self {
        Self {
            ws_sender,
            session_id,
            principal_id,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub async fn send_frame(&mut self, frame: &ServerFrame) -> Result<(), String> {
        let text = serde_json::to_string(frame)
            .map_err(|e| format!("Failed to serialize frame: {}", e))?;

        self.ws_sender
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| format!("Failed to send frame: {}", e))?;

        Ok(())
    }

    pub async fn send_ack(&mut self, request: &str) {
        let ack = ServerFrame::Ack {
            request: request.to_string(),
        };
        if self.send_frame(&ack).await.is_err() {
            tracing::debug!(session_id = %self.session_id, "Failed to ack disconnected client");
        }
    }

    pub async fn send_error(&mut self, code: &str, message: &str) {
        let error = ServerFrame::Error {
            code: code.to_string(),
            message: message.to_string(),
        };
        if self.send_frame(&error).await.is_err() {
            tracing::debug!(session_id = %self.session_id, "Failed to send error to disconnected client");
        }
    }

    /// Log an application error and report it to the client
    pub async fn send_app_error(&mut self, err: &AppError) {
        err.log();
        self.send_error(err.error_code(), &err.user_message()).await;
    }

    pub async fn close(&mut self) {
        let _ = self.ws_sender.send(WsMessage::Close(None)).await;
    }
}
