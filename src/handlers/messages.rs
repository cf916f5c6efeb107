use murmur_types::PrincipalId;
use uuid::Uuid;

use crate::context::AppContext;
use crate::handlers::connection::ConnectionHandler;

/// Send a direct message, opening the conversation on first contact.
/// The message itself reaches both parties as a `message:new` event.
pub async fn handle_send_message(
    handler: &mut ConnectionHandler,
    ctx: &AppContext,
    to_user_id: PrincipalId,
    content: String,
) {
    match ctx
        .messages
        .send_direct(handler.principal_id(), to_user_id, &content)
        .await
    {
        Ok(message) => {
            tracing::debug!(
                message_id = %message.id,
                conversation_id = %message.conversation_id,
                "Message appended"
            );
            handler.send_ack("send_message").await;
        }
        Err(e) => handler.send_app_error(&e).await,
    }
}

pub async fn handle_seen_message(
    handler: &mut ConnectionHandler,
    ctx: &AppContext,
    conversation_id: Uuid,
) {
    match ctx
        .messages
        .mark_seen(conversation_id, handler.principal_id())
        .await
    {
        Ok(updated) => {
            tracing::debug!(
                conversation_id = %conversation_id,
                updated = updated,
                "Messages marked seen"
            );
            handler.send_ack("seen_message").await;
        }
        Err(e) => handler.send_app_error(&e).await,
    }
}

/// Typing indicators are not acknowledged
pub async fn handle_typing(
    handler: &mut ConnectionHandler,
    ctx: &AppContext,
    to_user_id: PrincipalId,
) {
    if let Err(e) = ctx
        .messages
        .typing(handler.principal_id(), to_user_id)
        .await
    {
        handler.send_app_error(&e).await;
    }
}
