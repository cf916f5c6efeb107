use murmur_types::Topic;

use crate::context::AppContext;
use crate::handlers::connection::ConnectionHandler;

/// Join a topic. Repeating a subscribe is acknowledged like the first one.
pub async fn handle_subscribe(handler: &mut ConnectionHandler, ctx: &AppContext, topic: Topic) {
    match ctx.registry.subscribe(handler.session_id(), topic).await {
        Ok(changed) => {
            tracing::debug!(
                session_id = %handler.session_id(),
                topic = %topic,
                changed = changed,
                "Subscribe"
            );
            handler.send_ack("subscribe").await;
        }
        Err(e) => handler.send_app_error(&e).await,
    }
}

pub async fn handle_unsubscribe(handler: &mut ConnectionHandler, ctx: &AppContext, topic: Topic) {
    match ctx.registry.unsubscribe(handler.session_id(), topic).await {
        Ok(changed) => {
            tracing::debug!(
                session_id = %handler.session_id(),
                topic = %topic,
                changed = changed,
                "Unsubscribe"
            );
            handler.send_ack("unsubscribe").await;
        }
        Err(e) => handler.send_app_error(&e).await,
    }
}
