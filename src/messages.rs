// ============================================================================
// Message Store
// ============================================================================
//
// Direct messages inside two-party conversations.
//
// append: membership check, insert, then advance the conversation's
// last-message pointer with a conditional update that never moves it
// backwards. Fan-out to both inboxes runs detached.
//
// mark_seen / mark_delivered: one batched UPDATE over the other member's
// messages; repeating the call changes nothing.
// ============================================================================

use murmur_config::MAX_MESSAGE_LENGTH;
use murmur_db::{ConversationStore, MessageStore, Store};
use murmur_error::{AppError, AppResult};
use murmur_types::{Message, Page, PrincipalId, RealtimeEvent, Topic};
use std::sync::Arc;
use uuid::Uuid;

use crate::conversations::ConversationDirectory;
use crate::fanout::EventFanout;
use crate::utils::{clamp_page, validate_content};

pub struct MessageService {
    store: Arc<dyn Store>,
    conversations: Arc<ConversationDirectory>,
    fanout: Arc<EventFanout>,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn Store>,
        conversations: Arc<ConversationDirectory>,
        fanout: Arc<EventFanout>,
    ) -> Self {
        Self {
            store,
            conversations,
            fanout,
        }
    }

    /// Append a message to a conversation the sender belongs to
    pub async fn append(
        &self,
        conversation_id: Uuid,
        sender: PrincipalId,
        content: &str,
    ) -> AppResult<Message> {
        let conversation = self
            .conversations
            .get_for_participant(conversation_id, sender)
            .await?;
        let content = validate_content("Message", content, MAX_MESSAGE_LENGTH)?;
        let recipient = conversation
            .other_member(sender)
            .ok_or_else(|| AppError::NotAParticipant(conversation_id.to_string()))?;

        let mut message = Message::new(conversation.id, sender, content);
        // Delivered means at least one of the recipient's sessions is live.
        message.is_delivered = self.fanout.registry().is_online(recipient).await;

        self.store.insert_message(&message).await?;
        let advanced = self
            .store
            .advance_last_message(conversation.id, message.id, message.created_at)
            .await?;
        if !advanced {
            tracing::debug!(
                conversation_id = %conversation.id,
                message_id = %message.id,
                "Newer message already recorded as last"
            );
        }
        murmur_metrics::MESSAGES_SENT_TOTAL.inc();

        let fanout = self.fanout.clone();
        let event_message = message.clone();
        self.fanout.spawn_follow_up("message_new", async move {
            let conversation_id = event_message.conversation_id;
            let last_message_id = event_message.id;
            let updated_at = event_message.created_at;

            for member in [sender, recipient] {
                fanout
                    .emit(
                        Topic::inbox(member),
                        RealtimeEvent::MessageNew {
                            message: event_message.clone(),
                        },
                    )
                    .await?;
                fanout
                    .emit(
                        Topic::inbox(member),
                        RealtimeEvent::ConversationUpdated {
                            conversation_id,
                            last_message_id,
                            actor_id: sender,
                            updated_at,
                        },
                    )
                    .await?;
            }
            Ok(())
        });

        Ok(message)
    }

    /// Open (or reuse) the conversation with `recipient` and append to it
    pub async fn send_direct(
        &self,
        sender: PrincipalId,
        recipient: PrincipalId,
        content: &str,
    ) -> AppResult<Message> {
        // Validate before creating a conversation that would stay empty.
        validate_content("Message", content, MAX_MESSAGE_LENGTH)?;
        let conversation = self.conversations.get_or_create(sender, recipient).await?;
        self.append(conversation.id, sender, content).await
    }

    /// Mark every message from the other member as seen. Returns how many
    /// messages changed; the other member is told only when something did.
    pub async fn mark_seen(&self, conversation_id: Uuid, reader: PrincipalId) -> AppResult<u64> {
        let conversation = self
            .conversations
            .get_for_participant(conversation_id, reader)
            .await?;
        let updated = self.store.mark_seen(conversation_id, reader).await?;

        if updated > 0 {
            murmur_metrics::MESSAGES_SEEN_TOTAL.inc_by(updated);
            if let Some(other) = conversation.other_member(reader) {
                let fanout = self.fanout.clone();
                self.fanout.spawn_follow_up("message_seen", async move {
                    fanout
                        .emit(
                            Topic::inbox(other),
                            RealtimeEvent::MessageSeen {
                                conversation_id,
                                reader_id: reader,
                                updated,
                            },
                        )
                        .await?;
                    Ok(())
                });
            }
        }
        Ok(updated)
    }

    /// Mark every message from the other member as delivered
    pub async fn mark_delivered(
        &self,
        conversation_id: Uuid,
        recipient: PrincipalId,
    ) -> AppResult<u64> {
        self.conversations
            .get_for_participant(conversation_id, recipient)
            .await?;
        Ok(self.store.mark_delivered(conversation_id, recipient).await?)
    }

    /// Conversations with at least one unseen message from someone else
    pub async fn unread_conversation_count(&self, principal: PrincipalId) -> AppResult<u64> {
        Ok(self.store.unread_conversation_count(principal).await?)
    }

    /// One page of history. Pages count back from the newest message; the
    /// returned page is in chronological order.
    pub async fn history(
        &self,
        conversation_id: Uuid,
        reader: PrincipalId,
        page: Page,
    ) -> AppResult<Vec<Message>> {
        self.conversations
            .get_for_participant(conversation_id, reader)
            .await?;
        let mut messages = self.store.list_messages(conversation_id, clamp_page(page)).await?;
        messages.reverse();
        Ok(messages)
    }

    /// Soft-delete a message. Only its sender may do this.
    pub async fn delete_message(&self, message_id: Uuid, principal: PrincipalId) -> AppResult<()> {
        let message = self
            .store
            .find_message(message_id)
            .await?
            .filter(|m| !m.is_deleted)
            .ok_or_else(|| AppError::not_found(format!("message {}", message_id)))?;

        if message.sender_id != principal {
            return Err(AppError::forbidden("only the sender can delete a message"));
        }

        self.store.soft_delete_message(message_id, principal).await?;
        Ok(())
    }

    /// Push an ephemeral typing indicator to `recipient`. Nothing is stored.
    pub async fn typing(&self, sender: PrincipalId, recipient: PrincipalId) -> AppResult<usize> {
        if sender == recipient {
            return Err(AppError::InvalidPair);
        }
        self.fanout
            .emit(
                Topic::inbox(recipient),
                RealtimeEvent::Typing {
                    from_user_id: sender,
                },
            )
            .await
    }
}
