
use chrono::{DateTime, Utc};
use murmur_db::{
    ConversationStore, EngagementStore, FollowStore, LikeOutcome, MemoryStore, MessageStore,
    NotificationStore, Store, StoreResult,
};
use murmur_server::conversations::ConversationDirectory;
use murmur_types::{
    Comment, Conversation, ConversationSummary, Follow, Message, Notification, Page, PairKey,
    Post, PrincipalId, TargetRef,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use test_utils::spawn_context;
use uuid::Uuid;

#[tokio::test]
async fn test_conversation_with_self_rejected() {
    let app = spawn_context();
    let alice = Uuid::new_v4();

    let err = app
        .ctx
        .conversations
        .get_or_create(alice, alice)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PAIR");
    assert!(app
        .ctx
        .conversations
        .list_for_principal(alice)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_pair_order_does_not_matter() {
    let app = spawn_context();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let first = app.ctx.conversations.get_or_create(alice, bob).await.unwrap();
    let second = app.ctx.conversations.get_or_create(bob, alice).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.has_member(alice) && first.has_member(bob));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_get_or_create_yields_one_conversation() {
    let app = spawn_context();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let mut handles = Vec::new();
    for i in 0..32 {
        let ctx = app.ctx.clone();
        handles.push(tokio::spawn(async move {
            let (a, b) = if i % 2 == 0 { (alice, bob) } else { (bob, alice) };
            ctx.conversations.get_or_create(a, b).await.unwrap().id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 1);

    let listed = app.ctx.conversations.list_for_principal(alice).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(Some(&listed[0].conversation.id), ids.iter().next());
}

#[tokio::test]
async fn test_listing_carries_last_message() {
    let app = spawn_context();
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let quiet = app.ctx.conversations.get_or_create(alice, carol).await.unwrap();
    let message = app
        .ctx
        .messages
        .send_direct(alice, bob, "hello bob")
        .await
        .unwrap();

    let listed = app.ctx.conversations.list_for_principal(alice).await.unwrap();
    assert_eq!(listed.len(), 2);

    let with_bob = listed
        .iter()
        .find(|s| s.conversation.id == message.conversation_id)
        .unwrap();
    assert_eq!(with_bob.conversation.last_message_id, Some(message.id));
    assert_eq!(with_bob.last_message.as_ref().map(|m| m.id), Some(message.id));

    let with_carol = listed
        .iter()
        .find(|s| s.conversation.id == quiet.id)
        .unwrap();
    assert!(with_carol.last_message.is_none());

    // Bob sees only his conversation
    assert_eq!(
        app.ctx.conversations.list_for_principal(bob).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_outsider_cannot_open_conversation() {
    let app = spawn_context();
    let (alice, bob, mallory) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let conversation = app.ctx.conversations.get_or_create(alice, bob).await.unwrap();

    let err = app
        .ctx
        .conversations
        .get_for_participant(conversation.id, mallory)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_A_PARTICIPANT");

    let err = app
        .ctx
        .conversations
        .get_for_participant(Uuid::new_v4(), alice)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

/// Memory store whose first pair lookup misses while a rival creation commits
/// underneath it, so the following insert hits the unique pair key
struct RivalCommitsFirst {
    inner: MemoryStore,
    rival: Mutex<Option<Conversation>>,
}

#[async_trait::async_trait]
impl ConversationStore for RivalCommitsFirst {
    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        self.inner.insert_conversation(conversation).await
    }

    async fn find_conversation(&self, conversation_id: Uuid) -> StoreResult<Option<Conversation>> {
        self.inner.find_conversation(conversation_id).await
    }

    async fn find_conversation_by_pair(
        &self,
        pair_key: &PairKey,
    ) -> StoreResult<Option<Conversation>> {
        let rival = self.rival.lock().unwrap().take();
        if let Some(rival) = rival {
            self.inner.insert_conversation(&rival).await?;
            return Ok(None);
        }
        self.inner.find_conversation_by_pair(pair_key).await
    }

    async fn list_conversations_for(
        &self,
        principal: PrincipalId,
    ) -> StoreResult<Vec<ConversationSummary>> {
        self.inner.list_conversations_for(principal).await
    }

    async fn advance_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.inner.advance_last_message(conversation_id, message_id, at).await
    }
}

#[async_trait::async_trait]
impl EngagementStore for RivalCommitsFirst {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.inner.insert_post(post).await
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        self.inner.find_post(post_id).await
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        self.inner.find_comment(comment_id).await
    }

    async fn add_like(&self, principal: PrincipalId, target: TargetRef) -> StoreResult<LikeOutcome> {
        self.inner.add_like(principal, target).await
    }

    async fn remove_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> StoreResult<LikeOutcome> {
        self.inner.remove_like(principal, target).await
    }

    async fn is_liked(&self, principal: PrincipalId, target: TargetRef) -> StoreResult<bool> {
        self.inner.is_liked(principal, target).await
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.inner.insert_comment(comment).await
    }

    async fn adjust_comment_count(&self, post_id: Uuid, delta: i64) -> StoreResult<Option<i64>> {
        self.inner.adjust_comment_count(post_id, delta).await
    }

    async fn adjust_reply_count(&self, comment_id: Uuid, delta: i64) -> StoreResult<Option<i64>> {
        self.inner.adjust_reply_count(comment_id, delta).await
    }

    async fn delete_comment_tree(&self, comment_id: Uuid) -> StoreResult<Vec<Uuid>> {
        self.inner.delete_comment_tree(comment_id).await
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        parent: Option<Uuid>,
        page: Page,
    ) -> StoreResult<Vec<Comment>> {
        self.inner.list_comments(post_id, parent, page).await
    }
}

#[async_trait::async_trait]
impl MessageStore for RivalCommitsFirst {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.inner.insert_message(message).await
    }

    async fn find_message(&self, message_id: Uuid) -> StoreResult<Option<Message>> {
        self.inner.find_message(message_id).await
    }

    async fn mark_seen(&self, conversation_id: Uuid, reader: PrincipalId) -> StoreResult<u64> {
        self.inner.mark_seen(conversation_id, reader).await
    }

    async fn mark_delivered(
        &self,
        conversation_id: Uuid,
        recipient: PrincipalId,
    ) -> StoreResult<u64> {
        self.inner.mark_delivered(conversation_id, recipient).await
    }

    async fn unread_conversation_count(&self, principal: PrincipalId) -> StoreResult<u64> {
        self.inner.unread_conversation_count(principal).await
    }

    async fn list_messages(&self, conversation_id: Uuid, page: Page) -> StoreResult<Vec<Message>> {
        self.inner.list_messages(conversation_id, page).await
    }

    async fn soft_delete_message(
        &self,
        message_id: Uuid,
        sender: PrincipalId,
    ) -> StoreResult<bool> {
        self.inner.soft_delete_message(message_id, sender).await
    }
}

#[async_trait::async_trait]
impl NotificationStore for RivalCommitsFirst {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.inner.insert_notification(notification).await
    }

    async fn list_notifications(
        &self,
        receiver: PrincipalId,
        page: Page,
    ) -> StoreResult<Vec<Notification>> {
        self.inner.list_notifications(receiver, page).await
    }

    async fn unread_notification_count(&self, receiver: PrincipalId) -> StoreResult<u64> {
        self.inner.unread_notification_count(receiver).await
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<Option<Notification>> {
        self.inner.mark_notification_read(notification_id, receiver).await
    }

    async fn mark_all_notifications_read(&self, receiver: PrincipalId) -> StoreResult<u64> {
        self.inner.mark_all_notifications_read(receiver).await
    }

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<bool> {
        self.inner.delete_notification(notification_id, receiver).await
    }
}

#[async_trait::async_trait]
impl FollowStore for RivalCommitsFirst {
    async fn add_follow(&self, follow: &Follow) -> StoreResult<bool> {
        self.inner.add_follow(follow).await
    }

    async fn remove_follow(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> StoreResult<bool> {
        self.inner.remove_follow(follower, followee).await
    }

    async fn is_following(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> StoreResult<bool> {
        self.inner.is_following(follower, followee).await
    }

    async fn list_followers(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>> {
        self.inner.list_followers(principal).await
    }

    async fn list_following(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>> {
        self.inner.list_following(principal).await
    }
}

#[async_trait::async_trait]
impl Store for RivalCommitsFirst {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        "memory-rival"
    }
}

#[tokio::test]
async fn test_losing_creator_rereads_winner() {
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let pair_key = PairKey::new(alice, bob).unwrap();
    let rival = Conversation::new(pair_key, bob, alice);
    let store = Arc::new(RivalCommitsFirst {
        inner: MemoryStore::new(),
        rival: Mutex::new(Some(rival.clone())),
    });
    let directory = ConversationDirectory::new(store.clone());

    let races_before = murmur_metrics::CONVERSATION_RACES.get();
    let resolved = directory.get_or_create(alice, bob).await.unwrap();

    assert_eq!(resolved.id, rival.id);
    assert!(murmur_metrics::CONVERSATION_RACES.get() >= races_before + 1);
    assert_eq!(directory.list_for_principal(alice).await.unwrap().len(), 1);
    assert_eq!(
        store.inner.find_conversation_by_pair(&resolved.pair_key).await.unwrap().map(|c| c.id),
        Some(rival.id)
    );
}
