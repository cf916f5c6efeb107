// ============================================================================
// Durable Records
// ============================================================================
//
// Posts and comments are owned by the content service; Murmur only touches
// their engagement counters. Conversations, messages, notifications and
// follows are owned here.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ids::{PairKey, PrincipalId};

// ============================================================================
// Engagement targets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(TargetType::Post),
            "comment" => Ok(TargetType::Comment),
            _ => Err(format!("Unknown target type: {}", s)),
        }
    }
}

/// A likeable record: (type, id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: Uuid,
}

impl TargetRef {
    pub fn post(id: Uuid) -> Self {
        Self {
            target_type: TargetType::Post,
            target_id: id,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            target_type: TargetType::Comment,
            target_id: id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author_id: PrincipalId,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: PrincipalId) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            like_count: 0,
            comment_count: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: PrincipalId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
    pub like_count: i64,
    pub reply_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        post_id: Uuid,
        author_id: PrincipalId,
        content: String,
        parent_comment_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            parent_comment_id,
            like_count: 0,
            reply_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Result of a like/unlike call as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub target: TargetRef,
    pub liked: bool,
    pub like_count: i64,
    /// False when the call was a no-op (already in the requested state)
    pub changed: bool,
}

/// Outcome of removing a comment together with its replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRemoval {
    pub post_id: Uuid,
    pub comment_id: Uuid,
    pub removed_ids: Vec<Uuid>,
    pub comment_count: i64,
}

// ============================================================================
// Conversations and messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub members: [PrincipalId; 2],
    pub pair_key: PairKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub last_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh conversation for a validated pair. Members are stored in
    /// pair-key order.
    pub fn new(pair_key: PairKey, a: PrincipalId, b: PrincipalId) -> Self {
        let now = Utc::now();
        let members = if a < b { [a, b] } else { [b, a] };
        Self {
            id: Uuid::new_v4(),
            members,
            pair_key,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_member(&self, principal: PrincipalId) -> bool {
        self.members.contains(&principal)
    }

    /// The participant that is not `principal`
    pub fn other_member(&self, principal: PrincipalId) -> Option<PrincipalId> {
        if !self.has_member(principal) {
            return None;
        }
        self.members.iter().copied().find(|m| *m != principal)
    }
}

/// Conversation listing entry annotated with its most recent message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation: Conversation,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub last_message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: PrincipalId,
    pub content: String,
    pub is_delivered: bool,
    pub is_seen: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: Uuid, sender_id: PrincipalId, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content,
            is_delivered: false,
            is_seen: false,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Notifications and follows
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Reply,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Reply => "reply",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationKind::Like),
            "comment" => Ok(NotificationKind::Comment),
            "follow" => Ok(NotificationKind::Follow),
            "reply" => Ok(NotificationKind::Reply),
            _ => Err(format!("Unknown notification type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub receiver_id: PrincipalId,
    pub sender_id: PrincipalId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub reference_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub follower_id: PrincipalId,
    pub followee_id: PrincipalId,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Paging
// ============================================================================

/// 1-based page request. Limits are clamped by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}
