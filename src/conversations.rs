// ============================================================================
// Conversation Directory
// ============================================================================
//
// Resolves the single conversation of an unordered principal pair. Creation
// is insert-if-absent on the unique pair key: the caller that loses a
// concurrent race gets a unique violation and re-reads the winner's record.
// ============================================================================

use murmur_db::{ConversationStore, Store};
use murmur_error::{AppError, AppResult};
use murmur_types::{Conversation, ConversationSummary, PairKey, PrincipalId};
use std::sync::Arc;
use uuid::Uuid;

pub struct ConversationDirectory {
    store: Arc<dyn Store>,
}

impl ConversationDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The conversation between `a` and `b`, created on first use.
    /// `get_or_create(a, b)` and `get_or_create(b, a)` return the same record.
    pub async fn get_or_create(&self, a: PrincipalId, b: PrincipalId) -> AppResult<Conversation> {
        let pair_key = PairKey::new(a, b).ok_or(AppError::InvalidPair)?;

        if let Some(existing) = self.store.find_conversation_by_pair(&pair_key).await? {
            return Ok(existing);
        }

        let candidate = Conversation::new(pair_key.clone(), a, b);
        match self.store.insert_conversation(&candidate).await {
            Ok(()) => {
                murmur_metrics::CONVERSATIONS_CREATED.inc();
                tracing::debug!(conversation_id = %candidate.id, "Conversation created");
                Ok(candidate)
            }
            Err(e) if e.is_unique_violation() => {
                murmur_metrics::CONVERSATION_RACES.inc();
                self.store
                    .find_conversation_by_pair(&pair_key)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal("conversation vanished after unique violation")
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every conversation of `principal`, most recently active first, each
    /// with its latest message
    pub async fn list_for_principal(
        &self,
        principal: PrincipalId,
    ) -> AppResult<Vec<ConversationSummary>> {
        Ok(self.store.list_conversations_for(principal).await?)
    }

    /// Load a conversation on behalf of one of its members
    pub async fn get_for_participant(
        &self,
        conversation_id: Uuid,
        principal: PrincipalId,
    ) -> AppResult<Conversation> {
        let conversation = self
            .store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("conversation {}", conversation_id)))?;

        if !conversation.has_member(principal) {
            return Err(AppError::NotAParticipant(conversation_id.to_string()));
        }
        Ok(conversation)
    }
}
