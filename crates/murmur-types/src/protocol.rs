// ============================================================================
// WebSocket Protocol
// ============================================================================
//
// JSON text frames, tagged by "type".
//
// Client -> Server:
//   {"type":"subscribe","topic":"content-room:<uuid>"}
//   {"type":"unsubscribe","topic":"content-room:<uuid>"}
//   {"type":"send_message","toUserId":"<uuid>","content":"hi"}
//   {"type":"seen_message","conversationId":"<uuid>"}
//   {"type":"typing","toUserId":"<uuid>"}
//   {"type":"ping"}
//
// Server -> Client:
//   {"type":"event", ...EventEnvelope}
//   {"type":"ack","request":"subscribe"}
//   {"type":"error","code":"VALIDATION_ERROR","message":"..."}
//   {"type":"pong"}
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::EventEnvelope;
use crate::topic::Topic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        topic: Topic,
    },
    Unsubscribe {
        topic: Topic,
    },
    SendMessage {
        #[serde(rename = "toUserId")]
        to_user_id: Uuid,
        content: String,
    },
    SeenMessage {
        #[serde(rename = "conversationId")]
        conversation_id: Uuid,
    },
    Typing {
        #[serde(rename = "toUserId")]
        to_user_id: Uuid,
    },
    Ping,
}

impl ClientFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::Subscribe { .. } => "subscribe",
            ClientFrame::Unsubscribe { .. } => "unsubscribe",
            ClientFrame::SendMessage { .. } => "send_message",
            ClientFrame::SeenMessage { .. } => "seen_message",
            ClientFrame::Typing { .. } => "typing",
            ClientFrame::Ping => "ping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Event(EventEnvelope),
    Ack { request: String },
    Error { code: String, message: String },
    Pong,
}
