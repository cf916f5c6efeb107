// ============================================================================
// Engagement Ledger
// ============================================================================
//
// Likes and comments on posts.
//
// Like/unlike: one conditional store operation changes the membership row
// and the counter together. Repeating a call is a no-op that reports the
// current state (`changed = false`) and has no side effects.
//
// Comments: creating or removing a comment and adjusting the post/parent
// counters are separate atomic steps. There is no multi-record transaction,
// so a crash between them can leave the post counter briefly off; counters
// are clamped at zero and never go negative.
//
// Removing a comment hard-deletes its whole reply subtree.
//
// Events and notifications run as detached follow-ups after the mutation
// has committed.
// ============================================================================

use murmur_config::MAX_COMMENT_LENGTH;
use murmur_db::{EngagementStore, Store};
use murmur_error::{AppError, AppResult};
use murmur_types::{
    Comment, CommentRemoval, LikeState, NotificationKind, Page, PrincipalId, RealtimeEvent,
    TargetRef, TargetType, Topic,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::fanout::{EventFanout, NotificationDraft};
use crate::utils::{clamp_page, validate_content};

/// Who owns a like target and which room it belongs to
#[derive(Debug, Clone, Copy)]
struct TargetOwner {
    author_id: PrincipalId,
    post_id: Uuid,
}

pub struct EngagementLedger {
    store: Arc<dyn Store>,
    fanout: Arc<EventFanout>,
}

impl EngagementLedger {
    pub fn new(store: Arc<dyn Store>, fanout: Arc<EventFanout>) -> Self {
        Self { store, fanout }
    }

    // ========================================================================
    // Likes
    // ========================================================================

    /// Flip the principal's like on a target
    pub async fn toggle_like(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> AppResult<LikeState> {
        if self.store.is_liked(principal, target).await? {
            self.unlike(principal, target).await
        } else {
            self.like(principal, target).await
        }
    }

    /// Idempotent like
    pub async fn like(&self, principal: PrincipalId, target: TargetRef) -> AppResult<LikeState> {
        let owner = self.resolve_target(target).await?;
        let outcome = self.store.add_like(principal, target).await?;

        if outcome.applied {
            murmur_metrics::LIKE_TRANSITIONS
                .with_label_values(&[target.target_type.as_str(), "like"])
                .inc();
            self.schedule_like_follow_up(principal, target, owner, outcome.like_count, true);
        } else {
            murmur_metrics::LIKE_NOOPS.inc();
        }

        Ok(LikeState {
            target,
            liked: true,
            like_count: outcome.like_count,
            changed: outcome.applied,
        })
    }

    /// Idempotent unlike
    pub async fn unlike(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> AppResult<LikeState> {
        let owner = self.resolve_target(target).await?;
        let outcome = self.store.remove_like(principal, target).await?;

        if outcome.applied {
            murmur_metrics::LIKE_TRANSITIONS
                .with_label_values(&[target.target_type.as_str(), "unlike"])
                .inc();
            self.schedule_like_follow_up(principal, target, owner, outcome.like_count, false);
        } else {
            murmur_metrics::LIKE_NOOPS.inc();
        }

        Ok(LikeState {
            target,
            liked: false,
            like_count: outcome.like_count,
            changed: outcome.applied,
        })
    }

    /// Current like state of a target as seen by `principal`
    pub async fn like_state(
        &self,
        principal: PrincipalId,
        target: TargetRef,
    ) -> AppResult<LikeState> {
        let like_count = match target.target_type {
            TargetType::Post => self
                .store
                .find_post(target.target_id)
                .await?
                .map(|p| p.like_count),
            TargetType::Comment => self
                .store
                .find_comment(target.target_id)
                .await?
                .map(|c| c.like_count),
        }
        .ok_or_else(|| target_missing(target))?;

        Ok(LikeState {
            target,
            liked: self.store.is_liked(principal, target).await?,
            like_count,
            changed: false,
        })
    }

    async fn resolve_target(&self, target: TargetRef) -> AppResult<TargetOwner> {
        match target.target_type {
            TargetType::Post => self
                .store
                .find_post(target.target_id)
                .await?
                .map(|p| TargetOwner {
                    author_id: p.author_id,
                    post_id: p.id,
                }),
            TargetType::Comment => self
                .store
                .find_comment(target.target_id)
                .await?
                .map(|c| TargetOwner {
                    author_id: c.author_id,
                    post_id: c.post_id,
                }),
        }
        .ok_or_else(|| target_missing(target))
    }

    fn schedule_like_follow_up(
        &self,
        actor: PrincipalId,
        target: TargetRef,
        owner: TargetOwner,
        like_count: i64,
        liked: bool,
    ) {
        let event = match (target.target_type, liked) {
            (TargetType::Post, true) => RealtimeEvent::PostLiked {
                post_id: target.target_id,
                actor_id: actor,
                like_count,
            },
            (TargetType::Post, false) => RealtimeEvent::PostUnliked {
                post_id: target.target_id,
                actor_id: actor,
                like_count,
            },
            (TargetType::Comment, true) => RealtimeEvent::CommentLiked {
                comment_id: target.target_id,
                post_id: owner.post_id,
                actor_id: actor,
                like_count,
            },
            (TargetType::Comment, false) => RealtimeEvent::CommentUnliked {
                comment_id: target.target_id,
                post_id: owner.post_id,
                actor_id: actor,
                like_count,
            },
        };

        let fanout = self.fanout.clone();
        self.fanout.spawn_follow_up("like", async move {
            fanout.emit(Topic::room(owner.post_id), event.clone()).await?;
            // No notification for unlike; the author still sees the event
            if !liked && actor != owner.author_id {
                fanout.emit(Topic::inbox(owner.author_id), event).await?;
            }
            if liked {
                fanout
                    .notify_if_not_self(NotificationDraft {
                        actor,
                        recipient: owner.author_id,
                        kind: NotificationKind::Like,
                        reference_id: target.target_id,
                        content: format!("liked your {}", target.target_type),
                    })
                    .await?;
            }
            Ok(())
        });
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Create a comment (or a reply when `parent_comment_id` is set)
    pub async fn add_comment(
        &self,
        principal: PrincipalId,
        post_id: Uuid,
        content: &str,
        parent_comment_id: Option<Uuid>,
    ) -> AppResult<Comment> {
        let content = validate_content("Comment", content, MAX_COMMENT_LENGTH)?;

        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;

        let parent = match parent_comment_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .find_comment(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("comment {}", parent_id)))?;
                if parent.post_id != post_id {
                    return Err(AppError::validation(
                        "parent comment belongs to a different post",
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let comment = Comment::new(post_id, principal, content, parent_comment_id);
        self.store.insert_comment(&comment).await?;
        murmur_metrics::COMMENTS_CREATED.inc();

        let comment_count = match self.store.adjust_comment_count(post_id, 1).await? {
            Some(count) => count,
            None => {
                tracing::warn!(post_id = %post_id, "Post disappeared while adding a comment");
                0
            }
        };
        if let Some(parent) = &parent {
            self.store.adjust_reply_count(parent.id, 1).await?;
        }

        let fanout = self.fanout.clone();
        let event_comment = comment.clone();
        let post_author = post.author_id;
        let parent_author = parent.as_ref().map(|p| p.author_id);
        self.fanout.spawn_follow_up("comment_added", async move {
            fanout
                .emit(
                    Topic::room(post_id),
                    RealtimeEvent::CommentAdded {
                        comment: event_comment,
                        comment_count,
                    },
                )
                .await?;

            match parent_author {
                Some(parent_author) => {
                    fanout
                        .notify_if_not_self(NotificationDraft {
                            actor: principal,
                            recipient: parent_author,
                            kind: NotificationKind::Reply,
                            reference_id: post_id,
                            content: "replied to your comment".to_string(),
                        })
                        .await?;
                    if post_author != parent_author {
                        fanout
                            .notify_if_not_self(NotificationDraft {
                                actor: principal,
                                recipient: post_author,
                                kind: NotificationKind::Comment,
                                reference_id: post_id,
                                content: "commented on your post".to_string(),
                            })
                            .await?;
                    }
                }
                None => {
                    fanout
                        .notify_if_not_self(NotificationDraft {
                            actor: principal,
                            recipient: post_author,
                            kind: NotificationKind::Comment,
                            reference_id: post_id,
                            content: "commented on your post".to_string(),
                        })
                        .await?;
                }
            }
            Ok(())
        });

        Ok(comment)
    }

    /// Remove a comment together with all of its replies.
    ///
    /// Allowed for the comment author and the post owner. If the comment is
    /// already gone the call succeeds with no removed ids.
    pub async fn remove_comment(
        &self,
        principal: PrincipalId,
        comment_id: Uuid,
    ) -> AppResult<CommentRemoval> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("comment {}", comment_id)))?;
        let post_owner = self
            .store
            .find_post(comment.post_id)
            .await?
            .map(|p| p.author_id);

        if comment.author_id != principal && post_owner != Some(principal) {
            return Err(AppError::forbidden(
                "only the comment author or the post owner can remove a comment",
            ));
        }

        let removed_ids = self.store.delete_comment_tree(comment_id).await?;
        if removed_ids.is_empty() {
            let comment_count = self
                .store
                .find_post(comment.post_id)
                .await?
                .map(|p| p.comment_count)
                .unwrap_or(0);
            return Ok(CommentRemoval {
                post_id: comment.post_id,
                comment_id,
                removed_ids,
                comment_count,
            });
        }

        let removed = removed_ids.len() as i64;
        murmur_metrics::COMMENTS_REMOVED.inc_by(removed as u64);
        let comment_count = self
            .store
            .adjust_comment_count(comment.post_id, -removed)
            .await?
            .unwrap_or(0);
        if let Some(parent_id) = comment.parent_comment_id {
            self.store.adjust_reply_count(parent_id, -1).await?;
        }

        tracing::debug!(
            comment_id = %comment_id,
            post_id = %comment.post_id,
            removed = removed,
            "Comment tree removed"
        );

        let removal = CommentRemoval {
            post_id: comment.post_id,
            comment_id,
            removed_ids,
            comment_count,
        };

        let fanout = self.fanout.clone();
        let event = RealtimeEvent::CommentDeleted {
            post_id: removal.post_id,
            comment_id,
            actor_id: principal,
            removed_ids: removal.removed_ids.clone(),
            comment_count,
        };
        let room = Topic::room(removal.post_id);
        let comment_author = comment.author_id;
        self.fanout.spawn_follow_up("comment_deleted", async move {
            fanout.emit(room, event.clone()).await?;
            if comment_author != principal {
                fanout.emit(Topic::inbox(comment_author), event).await?;
            }
            Ok(())
        });

        Ok(removal)
    }

    /// Comments of a post under `parent` (None = top level), oldest first
    pub async fn list_comments(
        &self,
        post_id: Uuid,
        parent: Option<Uuid>,
        page: Page,
    ) -> AppResult<Vec<Comment>> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(AppError::not_found(format!("post {}", post_id)));
        }
        Ok(self.store.list_comments(post_id, parent, clamp_page(page)).await?)
    }
}

fn target_missing(target: TargetRef) -> AppError {
    AppError::not_found(format!("{} {}", target.target_type, target.target_id))
}
