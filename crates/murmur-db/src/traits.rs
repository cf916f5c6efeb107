use chrono::{DateTime, Utc};
use murmur_types::{
    Comment, Conversation, ConversationSummary, Follow, Message, Notification, Page, PairKey,
    Post, PrincipalId, TargetRef,
};
use uuid::Uuid;

use crate::error::StoreResult;

/// Result of a conditional like/unlike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    /// False when the relationship was already in the requested state
    pub applied: bool,
    /// Counter value after the operation
    pub like_count: i64,
}

/// Posts, comments and like membership
///
/// `add_like`/`remove_like` change the relationship set and the target's
/// counter in one atomic step, so the counter always equals the number of
/// relationship rows. Missing targets are reported as `StoreError::NotFound`.
#[async_trait::async_trait]
pub trait EngagementStore: Send + Sync {
    async fn insert_post(&self, post: &Post) -> StoreResult<()>;

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>>;

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>>;

    async fn add_like(&self, principal: PrincipalId, target: TargetRef)
        -> StoreResult<LikeOutcome>;

    async fn remove_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> StoreResult<LikeOutcome>;

    async fn is_liked(&self, principal: PrincipalId, target: TargetRef) -> StoreResult<bool>;

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;

    /// Add `delta` to the post's comment counter, never going below zero.
    /// Returns the new value, or None when the post does not exist.
    async fn adjust_comment_count(&self, post_id: Uuid, delta: i64) -> StoreResult<Option<i64>>;

    /// Same as `adjust_comment_count` for a comment's reply counter
    async fn adjust_reply_count(&self, comment_id: Uuid, delta: i64)
        -> StoreResult<Option<i64>>;

    /// Hard-delete a comment and every descendant reply along with their
    /// likes. Returns the ids actually removed (empty if already gone).
    async fn delete_comment_tree(&self, comment_id: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Comments of a post under `parent` (None = top level), oldest first
    async fn list_comments(
        &self,
        post_id: Uuid,
        parent: Option<Uuid>,
        page: Page,
    ) -> StoreResult<Vec<Comment>>;
}

/// Two-party conversation records keyed by their canonical pair key
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert-if-absent. A second record for the same pair key fails with
    /// `StoreError::UniqueViolation`.
    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()>;

    async fn find_conversation(&self, conversation_id: Uuid)
        -> StoreResult<Option<Conversation>>;

    async fn find_conversation_by_pair(&self, pair_key: &PairKey)
        -> StoreResult<Option<Conversation>>;

    /// Every conversation containing `principal`, most recently updated first
    async fn list_conversations_for(
        &self,
        principal: PrincipalId,
    ) -> StoreResult<Vec<ConversationSummary>>;

    /// Move the last-message pointer forward. Applied only when `at` is not
    /// older than the current `updated_at`; returns whether it was applied.
    async fn advance_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &Message) -> StoreResult<()>;

    async fn find_message(&self, message_id: Uuid) -> StoreResult<Option<Message>>;

    /// Flag every unseen message in the conversation not sent by `reader`.
    /// Returns how many rows changed.
    async fn mark_seen(&self, conversation_id: Uuid, reader: PrincipalId) -> StoreResult<u64>;

    /// Flag every undelivered message not sent by `recipient` as delivered
    async fn mark_delivered(&self, conversation_id: Uuid, recipient: PrincipalId)
        -> StoreResult<u64>;

    /// Conversations of `principal` holding at least one unseen message
    /// from the other participant
    async fn unread_conversation_count(&self, principal: PrincipalId) -> StoreResult<u64>;

    /// Non-deleted messages, newest first
    async fn list_messages(&self, conversation_id: Uuid, page: Page) -> StoreResult<Vec<Message>>;

    /// Soft delete restricted to the sender. Returns whether a row changed.
    async fn soft_delete_message(&self, message_id: Uuid, sender: PrincipalId)
        -> StoreResult<bool>;
}

/// Notification records, always scoped by receiver
#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;

    /// Newest first
    async fn list_notifications(
        &self,
        receiver: PrincipalId,
        page: Page,
    ) -> StoreResult<Vec<Notification>>;

    async fn unread_notification_count(&self, receiver: PrincipalId) -> StoreResult<u64>;

    /// None when no such notification belongs to `receiver`
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<Option<Notification>>;

    async fn mark_all_notifications_read(&self, receiver: PrincipalId) -> StoreResult<u64>;

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait FollowStore: Send + Sync {
    /// Insert-if-absent; returns whether a new edge was created
    async fn add_follow(&self, follow: &Follow) -> StoreResult<bool>;

    /// Returns whether an edge was removed
    async fn remove_follow(&self, follower: PrincipalId, followee: PrincipalId)
        -> StoreResult<bool>;

    async fn is_following(&self, follower: PrincipalId, followee: PrincipalId)
        -> StoreResult<bool>;

    async fn list_followers(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>>;

    async fn list_following(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>>;
}

/// Everything the coordination layer persists
#[async_trait::async_trait]
pub trait Store:
    EngagementStore + ConversationStore + MessageStore + NotificationStore + FollowStore
{
    /// Cheap liveness probe for readiness checks
    async fn ping(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
