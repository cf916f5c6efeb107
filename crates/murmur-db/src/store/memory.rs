// ============================================================================
// In-memory store
// ============================================================================
//
// All state lives behind one tokio RwLock. Each trait method takes the lock
// once, so every method is a single critical section and therefore atomic
// with respect to every other method.
// ============================================================================

use chrono::{DateTime, Utc};
use murmur_types::{
    Comment, Conversation, ConversationSummary, Follow, Message, Notification, Page, PairKey,
    Post, PrincipalId, TargetRef, TargetType,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    ConversationStore, EngagementStore, FollowStore, LikeOutcome, MessageStore,
    NotificationStore, Store,
};

#[derive(Default)]
struct State {
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    likes: HashSet<(PrincipalId, TargetRef)>,
    conversations: HashMap<Uuid, Conversation>,
    pair_index: HashMap<PairKey, Uuid>,
    /// Per conversation, in append order
    messages: HashMap<Uuid, Vec<Message>>,
    /// message id -> conversation id
    message_index: HashMap<Uuid, Uuid>,
    notifications: HashMap<Uuid, Notification>,
    follows: HashMap<(PrincipalId, PrincipalId), Follow>,
}

impl State {
    fn like_counter(&mut self, target: TargetRef) -> Option<&mut i64> {
        match target.target_type {
            TargetType::Post => self.posts.get_mut(&target.target_id).map(|p| &mut p.like_count),
            TargetType::Comment => self
                .comments
                .get_mut(&target.target_id)
                .map(|c| &mut c.like_count),
        }
    }

    fn message_mut(&mut self, message_id: Uuid) -> Option<&mut Message> {
        let conversation_id = *self.message_index.get(&message_id)?;
        self.messages
            .get_mut(&conversation_id)?
            .iter_mut()
            .find(|m| m.id == message_id)
    }
}

fn paginate<T>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

fn missing(target: TargetRef) -> StoreError {
    StoreError::NotFound(format!("{} {}", target.target_type, target.target_id))
}

/// Single-process store used for local runs and tests
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EngagementStore for MemoryStore {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.posts.contains_key(&post.id) {
            return Err(StoreError::UniqueViolation(format!("post {}", post.id)));
        }
        state.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&comment_id).cloned())
    }

    async fn add_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> StoreResult<LikeOutcome> {
        let mut state = self.state.write().await;
        if state.like_counter(target).is_none() {
            return Err(missing(target));
        }

        let applied = state.likes.insert((principal, target));
        let counter = state.like_counter(target).ok_or_else(|| missing(target))?;
        if applied {
            *counter += 1;
        }
        Ok(LikeOutcome {
            applied,
            like_count: *counter,
        })
    }

    async fn remove_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> StoreResult<LikeOutcome> {
        let mut state = self.state.write().await;
        if state.like_counter(target).is_none() {
            return Err(missing(target));
        }

        let applied = state.likes.remove(&(principal, target));
        let counter = state.like_counter(target).ok_or_else(|| missing(target))?;
        if applied {
            *counter = (*counter - 1).max(0);
        }
        Ok(LikeOutcome {
            applied,
            like_count: *counter,
        })
    }

    async fn is_liked(&self, principal: PrincipalId, target: TargetRef) -> StoreResult<bool> {
        Ok(self.state.read().await.likes.contains(&(principal, target)))
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(StoreError::NotFound(format!("post {}", comment.post_id)));
        }
        // The parent must still exist on the same post when the reply lands
        if let Some(parent_id) = comment.parent_comment_id {
            let parent_ok = state
                .comments
                .get(&parent_id)
                .is_some_and(|parent| parent.post_id == comment.post_id);
            if !parent_ok {
                return Err(StoreError::NotFound(format!("comment {}", parent_id)));
            }
        }
        if state.comments.contains_key(&comment.id) {
            return Err(StoreError::UniqueViolation(format!("comment {}", comment.id)));
        }
        state.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn adjust_comment_count(&self, post_id: Uuid, delta: i64) -> StoreResult<Option<i64>> {
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(&post_id).map(|post| {
            post.comment_count = (post.comment_count + delta).max(0);
            post.comment_count
        }))
    }

    async fn adjust_reply_count(
        &self,
        comment_id: Uuid,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let mut state = self.state.write().await;
        Ok(state.comments.get_mut(&comment_id).map(|comment| {
            comment.reply_count = (comment.reply_count + delta).max(0);
            comment.reply_count
        }))
    }

    async fn delete_comment_tree(&self, comment_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let mut state = self.state.write().await;
        if !state.comments.contains_key(&comment_id) {
            return Ok(Vec::new());
        }

        let mut removed = vec![comment_id];
        let mut cursor = 0;
        while cursor < removed.len() {
            let parent = removed[cursor];
            removed.extend(
                state
                    .comments
                    .values()
                    .filter(|c| c.parent_comment_id == Some(parent))
                    .map(|c| c.id),
            );
            cursor += 1;
        }

        for id in &removed {
            state.comments.remove(id);
        }
        let gone: HashSet<Uuid> = removed.iter().copied().collect();
        state.likes.retain(|(_, target)| {
            !(target.target_type == TargetType::Comment && gone.contains(&target.target_id))
        });

        Ok(removed)
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        parent: Option<Uuid>,
        page: Page,
    ) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<&Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.parent_comment_id == parent)
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(paginate(comments.into_iter().cloned(), page))
    }
}

#[async_trait::async_trait]
impl ConversationStore for MemoryStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.pair_index.contains_key(&conversation.pair_key) {
            return Err(StoreError::UniqueViolation(
                "conversations_pair_key_unique".to_string(),
            ));
        }
        state
            .pair_index
            .insert(conversation.pair_key.clone(), conversation.id);
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        Ok(self
            .state
            .read()
            .await
            .conversations
            .get(&conversation_id)
            .cloned())
    }

    async fn find_conversation_by_pair(
        &self,
        pair_key: &PairKey,
    ) -> StoreResult<Option<Conversation>> {
        let state = self.state.read().await;
        Ok(state
            .pair_index
            .get(pair_key)
            .and_then(|id| state.conversations.get(id))
            .cloned())
    }

    async fn list_conversations_for(
        &self,
        principal: PrincipalId,
    ) -> StoreResult<Vec<ConversationSummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .values()
            .filter(|c| c.has_member(principal))
            .map(|c| ConversationSummary {
                last_message: c.last_message_id.and_then(|message_id| {
                    state
                        .messages
                        .get(&c.id)
                        .and_then(|msgs| msgs.iter().find(|m| m.id == message_id))
                        .cloned()
                }),
                conversation: c.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| b.conversation.updated_at.cmp(&a.conversation.updated_at));
        Ok(summaries)
    }

    async fn advance_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.conversations.get_mut(&conversation_id) {
            Some(conversation) if conversation.updated_at <= at => {
                conversation.last_message_id = Some(message_id);
                conversation.updated_at = at;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!(
                "conversation {}",
                conversation_id
            ))),
        }
    }
}

#[async_trait::async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.conversations.contains_key(&message.conversation_id) {
            return Err(StoreError::NotFound(format!(
                "conversation {}",
                message.conversation_id
            )));
        }
        if state.message_index.contains_key(&message.id) {
            return Err(StoreError::UniqueViolation(format!("message {}", message.id)));
        }
        state
            .message_index
            .insert(message.id, message.conversation_id);
        state
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn find_message(&self, message_id: Uuid) -> StoreResult<Option<Message>> {
        let state = self.state.read().await;
        Ok(state
            .message_index
            .get(&message_id)
            .and_then(|conversation_id| state.messages.get(conversation_id))
            .and_then(|msgs| msgs.iter().find(|m| m.id == message_id))
            .cloned())
    }

    async fn mark_seen(&self, conversation_id: Uuid, reader: PrincipalId) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        if let Some(msgs) = state.messages.get_mut(&conversation_id) {
            for message in msgs
                .iter_mut()
                .filter(|m| m.sender_id != reader && !m.is_seen)
            {
                message.is_seen = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_delivered(
        &self,
        conversation_id: Uuid,
        recipient: PrincipalId,
    ) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        if let Some(msgs) = state.messages.get_mut(&conversation_id) {
            for message in msgs
                .iter_mut()
                .filter(|m| m.sender_id != recipient && !m.is_delivered)
            {
                message.is_delivered = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unread_conversation_count(&self, principal: PrincipalId) -> StoreResult<u64> {
        let state = self.state.read().await;
        let count = state
            .conversations
            .values()
            .filter(|c| c.has_member(principal))
            .filter(|c| {
                state.messages.get(&c.id).is_some_and(|msgs| {
                    msgs.iter()
                        .any(|m| m.sender_id != principal && !m.is_seen && !m.is_deleted)
                })
            })
            .count();
        Ok(count as u64)
    }

    async fn list_messages(&self, conversation_id: Uuid, page: Page) -> StoreResult<Vec<Message>> {
        let state = self.state.read().await;
        let Some(msgs) = state.messages.get(&conversation_id) else {
            return Ok(Vec::new());
        };
        Ok(paginate(
            msgs.iter().rev().filter(|m| !m.is_deleted).cloned(),
            page,
        ))
    }

    async fn soft_delete_message(
        &self,
        message_id: Uuid,
        sender: PrincipalId,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.message_mut(message_id) {
            Some(message) if message.sender_id == sender && !message.is_deleted => {
                message.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait::async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.notifications.contains_key(&notification.id) {
            return Err(StoreError::UniqueViolation(format!(
                "notification {}",
                notification.id
            )));
        }
        state
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        receiver: PrincipalId,
        page: Page,
    ) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut items: Vec<&Notification> = state
            .notifications
            .values()
            .filter(|n| n.receiver_id == receiver)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(items.into_iter().cloned(), page))
    }

    async fn unread_notification_count(&self, receiver: PrincipalId) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .values()
            .filter(|n| n.receiver_id == receiver && !n.is_read)
            .count() as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<Option<Notification>> {
        let mut state = self.state.write().await;
        Ok(state
            .notifications
            .get_mut(&notification_id)
            .filter(|n| n.receiver_id == receiver)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    async fn mark_all_notifications_read(&self, receiver: PrincipalId) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for n in state
            .notifications
            .values_mut()
            .filter(|n| n.receiver_id == receiver && !n.is_read)
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .notifications
            .get(&notification_id)
            .is_some_and(|n| n.receiver_id == receiver);
        if owned {
            state.notifications.remove(&notification_id);
        }
        Ok(owned)
    }
}

#[async_trait::async_trait]
impl FollowStore for MemoryStore {
    async fn add_follow(&self, follow: &Follow) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let key = (follow.follower_id, follow.followee_id);
        if state.follows.contains_key(&key) {
            return Ok(false);
        }
        state.follows.insert(key, follow.clone());
        Ok(true)
    }

    async fn remove_follow(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.follows.remove(&(follower, followee)).is_some())
    }

    async fn is_following(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.follows.contains_key(&(follower, followee)))
    }

    async fn list_followers(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>> {
        let state = self.state.read().await;
        let mut edges: Vec<&Follow> = state
            .follows
            .values()
            .filter(|f| f.followee_id == principal)
            .collect();
        edges.sort_by_key(|f| f.created_at);
        Ok(edges.into_iter().map(|f| f.follower_id).collect())
    }

    async fn list_following(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>> {
        let state = self.state.read().await;
        let mut edges: Vec<&Follow> = state
            .follows
            .values()
            .filter(|f| f.follower_id == principal)
            .collect();
        edges.sort_by_key(|f| f.created_at);
        Ok(edges.into_iter().map(|f| f.followee_id).collect())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_like_counter_tracks_membership() {
        let store = MemoryStore::new();
        let post = Post::new(Uuid::new_v4());
        store.insert_post(&post).await.unwrap();
        let target = TargetRef::post(post.id);
        let alice = Uuid::new_v4();

        let first = store.add_like(alice, target).await.unwrap();
        let second = store.add_like(alice, target).await.unwrap();
        assert!(first.applied);
        assert!(!second.applied);
        assert_eq!(second.like_count, 1);

        let removed = store.remove_like(alice, target).await.unwrap();
        let again = store.remove_like(alice, target).await.unwrap();
        assert!(removed.applied);
        assert!(!again.applied);
        assert_eq!(again.like_count, 0);
    }

    #[tokio::test]
    async fn test_like_on_missing_target() {
        let store = MemoryStore::new();
        let err = store
            .add_like(Uuid::new_v4(), TargetRef::comment(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_pair_key_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let key = PairKey::new(a, b).unwrap();

        store
            .insert_conversation(&Conversation::new(key.clone(), a, b))
            .await
            .unwrap();
        let err = store
            .insert_conversation(&Conversation::new(key.clone(), b, a))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_comment_tree_deletion_drops_likes() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let post = Post::new(author);
        store.insert_post(&post).await.unwrap();

        let root = Comment::new(post.id, author, "root".into(), None);
        let reply = Comment::new(post.id, author, "reply".into(), Some(root.id));
        let nested = Comment::new(post.id, author, "nested".into(), Some(reply.id));
        for c in [&root, &reply, &nested] {
            store.insert_comment(c).await.unwrap();
        }
        store
            .add_like(Uuid::new_v4(), TargetRef::comment(nested.id))
            .await
            .unwrap();

        let removed = store.delete_comment_tree(root.id).await.unwrap();
        assert_eq!(removed.len(), 3);
        assert!(store.delete_comment_tree(root.id).await.unwrap().is_empty());
        assert!(store.state.read().await.likes.is_empty());
    }

    #[tokio::test]
    async fn test_reply_requires_live_parent_on_same_post() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let post = Post::new(author);
        let other_post = Post::new(author);
        store.insert_post(&post).await.unwrap();
        store.insert_post(&other_post).await.unwrap();

        let orphan = Comment::new(post.id, author, "orphan".into(), Some(Uuid::new_v4()));
        assert!(matches!(
            store.insert_comment(&orphan).await,
            Err(StoreError::NotFound(_))
        ));

        let foreign = Comment::new(other_post.id, author, "elsewhere".into(), None);
        store.insert_comment(&foreign).await.unwrap();
        let crossed = Comment::new(post.id, author, "crossed".into(), Some(foreign.id));
        assert!(matches!(
            store.insert_comment(&crossed).await,
            Err(StoreError::NotFound(_))
        ));

        // Parent removed between the caller's read and the insert
        let root = Comment::new(post.id, author, "root".into(), None);
        store.insert_comment(&root).await.unwrap();
        store.delete_comment_tree(root.id).await.unwrap();
        let late = Comment::new(post.id, author, "late reply".into(), Some(root.id));
        assert!(store.insert_comment(&late).await.is_err());

        let state = store.state.read().await;
        assert_eq!(state.comments.len(), 1);
        assert!(state.comments.contains_key(&foreign.id));
    }

    #[tokio::test]
    async fn test_last_message_pointer_is_monotonic() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conversation = Conversation::new(PairKey::new(a, b).unwrap(), a, b);
        store.insert_conversation(&conversation).await.unwrap();

        let newer = Utc::now() + chrono::Duration::seconds(10);
        let older = Utc::now();
        let first = Uuid::new_v4();
        assert!(store
            .advance_last_message(conversation.id, first, newer)
            .await
            .unwrap());
        assert!(!store
            .advance_last_message(conversation.id, Uuid::new_v4(), older)
            .await
            .unwrap());

        let stored = store
            .find_conversation(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_message_id, Some(first));
    }
}
