// ============================================================================
// Real-time Events
// ============================================================================
//
// Every event Murmur can push to a client is a variant of RealtimeEvent.
// Wire names follow the "<entity>:<action>" convention clients already use
// (post:liked, comment:added, notification:new, ...).
//
// EventEnvelope is what actually travels: the event plus the topic it was
// published on, the reference/actor ids, optional counters and a timestamp.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ids::PrincipalId;
use crate::models::{Comment, Message, Notification};
use crate::topic::Topic;

/// Denormalized counters attached to engagement events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub reply_count: Option<i64>,
}

impl Counters {
    pub fn likes(n: i64) -> Self {
        Self {
            like_count: Some(n),
            ..Default::default()
        }
    }

    pub fn comments(n: i64) -> Self {
        Self {
            comment_count: Some(n),
            ..Default::default()
        }
    }

    fn has_negative(&self) -> bool {
        [self.like_count, self.comment_count, self.reply_count]
            .iter()
            .flatten()
            .any(|v| *v < 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum RealtimeEvent {
    PostLiked {
        post_id: Uuid,
        actor_id: PrincipalId,
        like_count: i64,
    },
    PostUnliked {
        post_id: Uuid,
        actor_id: PrincipalId,
        like_count: i64,
    },
    CommentLiked {
        comment_id: Uuid,
        post_id: Uuid,
        actor_id: PrincipalId,
        like_count: i64,
    },
    CommentUnliked {
        comment_id: Uuid,
        post_id: Uuid,
        actor_id: PrincipalId,
        like_count: i64,
    },
    CommentAdded {
        comment: Comment,
        comment_count: i64,
    },
    CommentDeleted {
        post_id: Uuid,
        comment_id: Uuid,
        actor_id: PrincipalId,
        removed_ids: Vec<Uuid>,
        comment_count: i64,
    },
    NotificationNew {
        notification: Notification,
    },
    NotificationRead {
        receiver_id: PrincipalId,
        /// None when every notification was marked read
        notification_id: Option<Uuid>,
    },
    UserFollowed {
        follower_id: PrincipalId,
        followee_id: PrincipalId,
    },
    UserUnfollowed {
        follower_id: PrincipalId,
        followee_id: PrincipalId,
    },
    MessageNew {
        message: Message,
    },
    MessageSeen {
        conversation_id: Uuid,
        reader_id: PrincipalId,
        updated: u64,
    },
    ConversationUpdated {
        conversation_id: Uuid,
        last_message_id: Uuid,
        actor_id: PrincipalId,
        updated_at: DateTime<Utc>,
    },
    Typing {
        from_user_id: PrincipalId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event {event} cannot be published on {topic}")]
    WrongTopic { event: &'static str, topic: String },

    #[error("event {0} carries a negative counter")]
    NegativeCounter(&'static str),
}

impl RealtimeEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::PostLiked { .. } => "post:liked",
            RealtimeEvent::PostUnliked { .. } => "post:unliked",
            RealtimeEvent::CommentLiked { .. } => "comment:liked",
            RealtimeEvent::CommentUnliked { .. } => "comment:unliked",
            RealtimeEvent::CommentAdded { .. } => "comment:added",
            RealtimeEvent::CommentDeleted { .. } => "comment:deleted",
            RealtimeEvent::NotificationNew { .. } => "notification:new",
            RealtimeEvent::NotificationRead { .. } => "notification:read",
            RealtimeEvent::UserFollowed { .. } => "user:followed",
            RealtimeEvent::UserUnfollowed { .. } => "user:unfollowed",
            RealtimeEvent::MessageNew { .. } => "message:new",
            RealtimeEvent::MessageSeen { .. } => "message:seen",
            RealtimeEvent::ConversationUpdated { .. } => "conversation:updated",
            RealtimeEvent::Typing { .. } => "typing",
        }
    }

    /// Id of the record the event is about
    pub fn reference_id(&self) -> Uuid {
        match self {
            RealtimeEvent::PostLiked { post_id, .. }
            | RealtimeEvent::PostUnliked { post_id, .. } => *post_id,
            RealtimeEvent::CommentLiked { comment_id, .. }
            | RealtimeEvent::CommentUnliked { comment_id, .. }
            | RealtimeEvent::CommentDeleted { comment_id, .. } => *comment_id,
            RealtimeEvent::CommentAdded { comment, .. } => comment.id,
            RealtimeEvent::NotificationNew { notification } => notification.id,
            RealtimeEvent::NotificationRead {
                receiver_id,
                notification_id,
            } => notification_id.unwrap_or(*receiver_id),
            RealtimeEvent::UserFollowed { followee_id, .. }
            | RealtimeEvent::UserUnfollowed { followee_id, .. } => *followee_id,
            RealtimeEvent::MessageNew { message } => message.id,
            RealtimeEvent::MessageSeen {
                conversation_id, ..
            }
            | RealtimeEvent::ConversationUpdated {
                conversation_id, ..
            } => *conversation_id,
            RealtimeEvent::Typing { from_user_id } => *from_user_id,
        }
    }

    /// Principal whose action produced the event
    pub fn actor_id(&self) -> PrincipalId {
        match self {
            RealtimeEvent::PostLiked { actor_id, .. }
            | RealtimeEvent::PostUnliked { actor_id, .. }
            | RealtimeEvent::CommentLiked { actor_id, .. }
            | RealtimeEvent::CommentUnliked { actor_id, .. }
            | RealtimeEvent::CommentDeleted { actor_id, .. }
            | RealtimeEvent::ConversationUpdated { actor_id, .. } => *actor_id,
            RealtimeEvent::CommentAdded { comment, .. } => comment.author_id,
            RealtimeEvent::NotificationNew { notification } => notification.sender_id,
            RealtimeEvent::NotificationRead { receiver_id, .. } => *receiver_id,
            RealtimeEvent::UserFollowed { follower_id, .. }
            | RealtimeEvent::UserUnfollowed { follower_id, .. } => *follower_id,
            RealtimeEvent::MessageNew { message } => message.sender_id,
            RealtimeEvent::MessageSeen { reader_id, .. } => *reader_id,
            RealtimeEvent::Typing { from_user_id } => *from_user_id,
        }
    }

    pub fn counters(&self) -> Option<Counters> {
        match self {
            RealtimeEvent::PostLiked { like_count, .. }
            | RealtimeEvent::PostUnliked { like_count, .. }
            | RealtimeEvent::CommentLiked { like_count, .. }
            | RealtimeEvent::CommentUnliked { like_count, .. } => Some(Counters::likes(*like_count)),
            RealtimeEvent::CommentAdded {
                comment_count,
                comment,
            } => Some(Counters {
                comment_count: Some(*comment_count),
                reply_count: comment.parent_comment_id.map(|_| comment.reply_count),
                ..Default::default()
            }),
            RealtimeEvent::CommentDeleted { comment_count, .. } => {
                Some(Counters::comments(*comment_count))
            }
            _ => None,
        }
    }

    /// Whether this event may be published on the given topic family.
    /// Personal events only travel through inboxes; engagement events may
    /// go to either the content room or the affected user's inbox.
    pub fn allowed_on(&self, topic: &Topic) -> bool {
        match self {
            RealtimeEvent::PostLiked { .. }
            | RealtimeEvent::PostUnliked { .. }
            | RealtimeEvent::CommentLiked { .. }
            | RealtimeEvent::CommentUnliked { .. }
            | RealtimeEvent::CommentAdded { .. }
            | RealtimeEvent::CommentDeleted { .. } => true,
            RealtimeEvent::NotificationNew { notification } => {
                *topic == Topic::inbox(notification.receiver_id)
            }
            RealtimeEvent::NotificationRead { receiver_id, .. } => {
                *topic == Topic::inbox(*receiver_id)
            }
            RealtimeEvent::UserFollowed { .. }
            | RealtimeEvent::UserUnfollowed { .. }
            | RealtimeEvent::MessageNew { .. }
            | RealtimeEvent::MessageSeen { .. }
            | RealtimeEvent::ConversationUpdated { .. }
            | RealtimeEvent::Typing { .. } => topic.is_inbox(),
        }
    }

    /// Schema check applied at the fan-out boundary
    pub fn validate_for(&self, topic: &Topic) -> Result<(), EventError> {
        if !self.allowed_on(topic) {
            return Err(EventError::WrongTopic {
                event: self.name(),
                topic: topic.to_string(),
            });
        }
        if self.counters().is_some_and(|c| c.has_negative()) {
            return Err(EventError::NegativeCounter(self.name()));
        }
        Ok(())
    }
}

/// What a subscribed session receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_type: String,
    pub topic: Topic,
    pub reference_id: Uuid,
    pub actor_id: PrincipalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub counters: Option<Counters>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: RealtimeEvent,
}

impl EventEnvelope {
    /// Validate `event` for `topic` and wrap it
    pub fn seal(topic: Topic, event: RealtimeEvent) -> Result<Self, EventError> {
        event.validate_for(&topic)?;
        Ok(Self {
            event_type: event.name().to_string(),
            topic,
            reference_id: event.reference_id(),
            actor_id: event.actor_id(),
            counters: event.counters(),
            timestamp: Utc::now(),
            payload: event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;

    fn notification_for(receiver: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            receiver_id: receiver,
            sender_id: Uuid::new_v4(),
            kind: NotificationKind::Like,
            reference_id: Uuid::new_v4(),
            content: "liked your post".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_notification_only_to_receiver_inbox() {
        let receiver = Uuid::new_v4();
        let event = RealtimeEvent::NotificationNew {
            notification: notification_for(receiver),
        };
        assert!(event.validate_for(&Topic::inbox(receiver)).is_ok());
        assert!(event.validate_for(&Topic::inbox(Uuid::new_v4())).is_err());
        assert!(event.validate_for(&Topic::room(receiver)).is_err());
    }

    #[test]
    fn test_negative_counter_rejected() {
        let event = RealtimeEvent::PostUnliked {
            post_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            like_count: -1,
        };
        assert_eq!(
            event.validate_for(&Topic::room(Uuid::new_v4())),
            Err(EventError::NegativeCounter("post:unliked"))
        );
    }

    #[test]
    fn test_envelope_wire_shape() {
        let post_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let envelope = EventEnvelope::seal(
            Topic::room(post_id),
            RealtimeEvent::PostLiked {
                post_id,
                actor_id: actor,
                like_count: 3,
            },
        )
        .unwrap();

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["eventType"], "post:liked");
        assert_eq!(value["topic"], format!("content-room:{}", post_id));
        assert_eq!(value["referenceId"], post_id.to_string());
        assert_eq!(value["actorId"], actor.to_string());
        assert_eq!(value["counters"]["likeCount"], 3);
        assert_eq!(value["event"], "post_liked");
        assert_eq!(value["data"]["likeCount"], 3);
        assert_eq!(value["data"]["actorId"], actor.to_string());

        let back: EventEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_message_events_stay_in_inboxes() {
        let event = RealtimeEvent::Typing {
            from_user_id: Uuid::new_v4(),
        };
        assert!(event.validate_for(&Topic::room(Uuid::new_v4())).is_err());
        assert!(event.validate_for(&Topic::inbox(Uuid::new_v4())).is_ok());
    }
}
