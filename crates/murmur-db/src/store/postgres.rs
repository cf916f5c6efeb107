// ============================================================================
// PostgreSQL store
// ============================================================================
//
// Every mutation is one statement. Like/unlike and comment-tree deletion use
// data-modifying CTEs so the relationship rows and the denormalized counters
// change together; conversation creation relies on the unique pair_key
// constraint; status flips are predicate-guarded UPDATEs.
// ============================================================================

use chrono::{DateTime, Utc};
use murmur_types::{
    Comment, Conversation, ConversationSummary, Follow, Message, Notification,
    NotificationKind, Page, PairKey, Post, PrincipalId, TargetRef, TargetType,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    ConversationStore, EngagementStore, FollowStore, LikeOutcome, MessageStore,
    NotificationStore, Store,
};

/// PostgreSQL implementation of [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn target_table(target_type: TargetType) -> &'static str {
    match target_type {
        TargetType::Post => "posts",
        TargetType::Comment => "comments",
    }
}

fn page_bounds(page: Page) -> (i64, i64) {
    (page.limit as i64, page.offset() as i64)
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    member_a: Uuid,
    member_b: Uuid,
    pair_key: String,
    last_message_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            members: [row.member_a, row.member_b],
            pair_key: PairKey::from_stored(row.pair_key),
            last_message_id: row.last_message_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ConversationSummaryRow {
    #[sqlx(flatten)]
    conversation: ConversationRow,
    m_id: Option<Uuid>,
    m_sender_id: Option<Uuid>,
    m_content: Option<String>,
    m_is_delivered: Option<bool>,
    m_is_seen: Option<bool>,
    m_is_deleted: Option<bool>,
    m_created_at: Option<DateTime<Utc>>,
}

impl From<ConversationSummaryRow> for ConversationSummary {
    fn from(row: ConversationSummaryRow) -> Self {
        let conversation_id = row.conversation.id;
        let last_message = match (row.m_id, row.m_sender_id, row.m_created_at) {
            (Some(id), Some(sender_id), Some(created_at)) => Some(Message {
                id,
                conversation_id,
                sender_id,
                content: row.m_content.unwrap_or_default(),
                is_delivered: row.m_is_delivered.unwrap_or(false),
                is_seen: row.m_is_seen.unwrap_or(false),
                is_deleted: row.m_is_deleted.unwrap_or(false),
                created_at,
            }),
            _ => None,
        };
        ConversationSummary {
            conversation: row.conversation.into(),
            last_message,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: String,
    is_delivered: bool,
    is_seen: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            is_delivered: row.is_delivered,
            is_seen: row.is_seen,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    receiver_id: Uuid,
    sender_id: Uuid,
    kind: String,
    reference_id: Uuid,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind: NotificationKind = row.kind.parse().map_err(StoreError::Decode)?;
        Ok(Notification {
            id: row.id,
            receiver_id: row.receiver_id,
            sender_id: row.sender_id,
            kind,
            reference_id: row.reference_id,
            content: row.content,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LikeRow {
    applied: bool,
    like_count: Option<i64>,
}

const POST_COLUMNS: &str = "id, author_id, like_count, comment_count, created_at";
const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, content, parent_comment_id, like_count, reply_count, created_at";
const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, content, is_delivered, is_seen, is_deleted, created_at";
const NOTIFICATION_COLUMNS: &str =
    "id, receiver_id, sender_id, kind, reference_id, content, is_read, created_at";
const CONVERSATION_COLUMNS: &str =
    "id, member_a, member_b, pair_key, last_message_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    like_count: i64,
    comment_count: i64,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            author_id: row.author_id,
            like_count: row.like_count,
            comment_count: row.comment_count,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    content: String,
    parent_comment_id: Option<Uuid>,
    like_count: i64,
    reply_count: i64,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            content: row.content,
            parent_comment_id: row.parent_comment_id,
            like_count: row.like_count,
            reply_count: row.reply_count,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Engagement
// ============================================================================

#[async_trait::async_trait]
impl EngagementStore for PgStore {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, like_count, comment_count, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(post.like_count)
        .bind(post.comment_count)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {} FROM comments WHERE id = $1",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn add_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> StoreResult<LikeOutcome> {
        let table = target_table(target.target_type);
        // The final SELECT sees the pre-statement snapshot, so the bumped
        // value must come from the UPDATE's RETURNING.
        let sql = format!(
            r#"
            WITH ins AS (
                INSERT INTO likes (principal_id, target_type, target_id)
                SELECT $1, $2, $3
                WHERE EXISTS (SELECT 1 FROM {table} WHERE id = $3)
                ON CONFLICT DO NOTHING
                RETURNING target_id
            ),
            bumped AS (
                UPDATE {table} SET like_count = like_count + 1
                WHERE id IN (SELECT target_id FROM ins)
                RETURNING like_count
            )
            SELECT
                EXISTS (SELECT 1 FROM ins) AS applied,
                COALESCE(
                    (SELECT like_count FROM bumped),
                    (SELECT like_count FROM {table} WHERE id = $3)
                ) AS like_count
            "#,
            table = table
        );

        let row = sqlx::query_as::<_, LikeRow>(&sql)
            .bind(principal)
            .bind(target.target_type.as_str())
            .bind(target.target_id)
            .fetch_one(&self.pool)
            .await?;

        let like_count = row.like_count.ok_or_else(|| {
            StoreError::NotFound(format!("{} {}", target.target_type, target.target_id))
        })?;
        Ok(LikeOutcome {
            applied: row.applied,
            like_count,
        })
    }

    async fn remove_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> StoreResult<LikeOutcome> {
        let table = target_table(target.target_type);
        let sql = format!(
            r#"
            WITH del AS (
                DELETE FROM likes
                WHERE principal_id = $1 AND target_type = $2 AND target_id = $3
                RETURNING target_id
            ),
            dropped AS (
                UPDATE {table} SET like_count = GREATEST(like_count - 1, 0)
                WHERE id IN (SELECT target_id FROM del)
                RETURNING like_count
            )
            SELECT
                EXISTS (SELECT 1 FROM del) AS applied,
                COALESCE(
                    (SELECT like_count FROM dropped),
                    (SELECT like_count FROM {table} WHERE id = $3)
                ) AS like_count
            "#,
            table = table
        );

        let row = sqlx::query_as::<_, LikeRow>(&sql)
            .bind(principal)
            .bind(target.target_type.as_str())
            .bind(target.target_id)
            .fetch_one(&self.pool)
            .await?;

        let like_count = row.like_count.ok_or_else(|| {
            StoreError::NotFound(format!("{} {}", target.target_type, target.target_id))
        })?;
        Ok(LikeOutcome {
            applied: row.applied,
            like_count,
        })
    }

    async fn is_liked(&self, principal: PrincipalId, target: TargetRef) -> StoreResult<bool> {
        let liked = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM likes
                WHERE principal_id = $1 AND target_type = $2 AND target_id = $3
            )
            "#,
        )
        .bind(principal)
        .bind(target.target_type.as_str())
        .bind(target.target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(liked)
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        // A reply only lands while its parent is still on the same post
        let inserted = sqlx::query(
            r#"
            INSERT INTO comments
                (id, post_id, author_id, content, parent_comment_id, like_count, reply_count, created_at)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE $5::uuid IS NULL
               OR EXISTS (SELECT 1 FROM comments WHERE id = $5 AND post_id = $2)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.parent_comment_id)
        .bind(comment.like_count)
        .bind(comment.reply_count)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            let parent = comment.parent_comment_id.unwrap_or(comment.post_id);
            return Err(StoreError::NotFound(format!("comment {}", parent)));
        }
        Ok(())
    }

    async fn adjust_comment_count(&self, post_id: Uuid, delta: i64) -> StoreResult<Option<i64>> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE posts SET comment_count = GREATEST(comment_count + $2, 0)
            WHERE id = $1
            RETURNING comment_count
            "#,
        )
        .bind(post_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }

    async fn adjust_reply_count(
        &self,
        comment_id: Uuid,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE comments SET reply_count = GREATEST(reply_count + $2, 0)
            WHERE id = $1
            RETURNING reply_count
            "#,
        )
        .bind(comment_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_comment_tree(&self, comment_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let removed = sqlx::query_scalar::<_, Uuid>(
            r#"
            WITH RECURSIVE tree AS (
                SELECT id FROM comments WHERE id = $1
                UNION ALL
                SELECT c.id FROM comments c JOIN tree t ON c.parent_comment_id = t.id
            ),
            gone AS (
                DELETE FROM comments WHERE id IN (SELECT id FROM tree)
                RETURNING id
            ),
            unliked AS (
                DELETE FROM likes
                WHERE target_type = 'comment' AND target_id IN (SELECT id FROM gone)
            )
            SELECT id FROM gone
            "#,
        )
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(removed)
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        parent: Option<Uuid>,
        page: Page,
    ) -> StoreResult<Vec<Comment>> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            SELECT {}
            FROM comments
            WHERE post_id = $1 AND parent_comment_id IS NOT DISTINCT FROM $2
            ORDER BY created_at ASC, id ASC
            LIMIT $3 OFFSET $4
            "#,
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .bind(parent)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Conversations
// ============================================================================

#[async_trait::async_trait]
impl ConversationStore for PgStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations
                (id, member_a, member_b, pair_key, last_message_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(conversation.id)
        .bind(conversation.members[0])
        .bind(conversation.members[1])
        .bind(conversation.pair_key.as_str())
        .bind(conversation.last_message_id)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {} FROM conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_conversation_by_pair(
        &self,
        pair_key: &PairKey,
    ) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {} FROM conversations WHERE pair_key = $1",
            CONVERSATION_COLUMNS
        ))
        .bind(pair_key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_conversations_for(
        &self,
        principal: PrincipalId,
    ) -> StoreResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationSummaryRow>(
            r#"
            SELECT
                c.id, c.member_a, c.member_b, c.pair_key, c.last_message_id,
                c.created_at, c.updated_at,
                m.id AS m_id, m.sender_id AS m_sender_id, m.content AS m_content,
                m.is_delivered AS m_is_delivered, m.is_seen AS m_is_seen,
                m.is_deleted AS m_is_deleted, m.created_at AS m_created_at
            FROM conversations c
            LEFT JOIN messages m ON m.id = c.last_message_id
            WHERE c.member_a = $1 OR c.member_b = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(principal)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn advance_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_id = $2, updated_at = $3
            WHERE id = $1 AND updated_at <= $3
            "#,
        )
        .bind(conversation_id)
        .bind(message_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Messages
// ============================================================================

#[async_trait::async_trait]
impl MessageStore for PgStore {
    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages
                (id, conversation_id, sender_id, content, is_delivered, is_seen, is_deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.is_delivered)
        .bind(message.is_seen)
        .bind(message.is_deleted)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_message(&self, message_id: Uuid) -> StoreResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn mark_seen(&self, conversation_id: Uuid, reader: PrincipalId) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_seen = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_seen
            "#,
        )
        .bind(conversation_id)
        .bind(reader)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_delivered(
        &self,
        conversation_id: Uuid,
        recipient: PrincipalId,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_delivered = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_delivered
            "#,
        )
        .bind(conversation_id)
        .bind(recipient)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_conversation_count(&self, principal: PrincipalId) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT m.conversation_id)
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE (c.member_a = $1 OR c.member_b = $1)
              AND m.sender_id <> $1
              AND NOT m.is_seen
              AND NOT m.is_deleted
            "#,
        )
        .bind(principal)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn list_messages(&self, conversation_id: Uuid, page: Page) -> StoreResult<Vec<Message>> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE conversation_id = $1 AND NOT is_deleted
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn soft_delete_message(
        &self,
        message_id: Uuid,
        sender: PrincipalId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_deleted = TRUE
            WHERE id = $1 AND sender_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(message_id)
        .bind(sender)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[async_trait::async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, receiver_id, sender_id, kind, reference_id, content, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.receiver_id)
        .bind(notification.sender_id)
        .bind(notification.kind.as_str())
        .bind(notification.reference_id)
        .bind(&notification.content)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        receiver: PrincipalId,
        page: Page,
    ) -> StoreResult<Vec<Notification>> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE receiver_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(receiver)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn unread_notification_count(&self, receiver: PrincipalId) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE receiver_id = $1 AND NOT is_read",
        )
        .bind(receiver)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND receiver_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(receiver)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Notification::try_from).transpose()
    }

    async fn mark_all_notifications_read(&self, receiver: PrincipalId) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE receiver_id = $1 AND NOT is_read",
        )
        .bind(receiver)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE id = $1 AND receiver_id = $2")
                .bind(notification_id)
                .bind(receiver)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Follows
// ============================================================================

#[async_trait::async_trait]
impl FollowStore for PgStore {
    async fn add_follow(&self, follow: &Follow) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follow.follower_id)
        .bind(follow.followee_id)
        .bind(follow.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_follow(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower)
            .bind(followee)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower)
        .bind(followee)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_followers(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT follower_id FROM follows WHERE followee_id = $1 ORDER BY created_at",
        )
        .bind(principal)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_following(&self, principal: PrincipalId) -> StoreResult<Vec<PrincipalId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT followee_id FROM follows WHERE follower_id = $1 ORDER BY created_at",
        )
        .bind(principal)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
