// ============================================================================
// Follow Graph
// ============================================================================

use chrono::Utc;
use murmur_db::{FollowStore, Store};
use murmur_error::{AppError, AppResult};
use murmur_types::{Follow, NotificationKind, PrincipalId, RealtimeEvent, Topic};
use std::sync::Arc;

use crate::fanout::{EventFanout, NotificationDraft};

pub struct FollowGraph {
    store: Arc<dyn Store>,
    fanout: Arc<EventFanout>,
}

impl FollowGraph {
    pub fn new(store: Arc<dyn Store>, fanout: Arc<EventFanout>) -> Self {
        Self { store, fanout }
    }

    /// Idempotent follow. Returns whether a new edge was created; only a new
    /// edge notifies the followee.
    pub async fn follow(&self, follower: PrincipalId, followee: PrincipalId) -> AppResult<bool> {
        if follower == followee {
            return Err(AppError::validation("cannot follow yourself"));
        }

        let created = self
            .store
            .add_follow(&Follow {
                follower_id: follower,
                followee_id: followee,
                created_at: Utc::now(),
            })
            .await?;

        if created {
            let fanout = self.fanout.clone();
            self.fanout.spawn_follow_up("user_followed", async move {
                fanout
                    .emit(
                        Topic::inbox(followee),
                        RealtimeEvent::UserFollowed {
                            follower_id: follower,
                            followee_id: followee,
                        },
                    )
                    .await?;
                fanout
                    .notify_if_not_self(NotificationDraft {
                        actor: follower,
                        recipient: followee,
                        kind: NotificationKind::Follow,
                        reference_id: follower,
                        content: "started following you".to_string(),
                    })
                    .await?;
                Ok(())
            });
        }
        Ok(created)
    }

    /// Idempotent unfollow. Returns whether an edge was removed.
    pub async fn unfollow(&self, follower: PrincipalId, followee: PrincipalId) -> AppResult<bool> {
        if follower == followee {
            return Err(AppError::validation("cannot unfollow yourself"));
        }

        let removed = self.store.remove_follow(follower, followee).await?;
        if removed {
            let fanout = self.fanout.clone();
            self.fanout.spawn_follow_up("user_unfollowed", async move {
                fanout
                    .emit(
                        Topic::inbox(followee),
                        RealtimeEvent::UserUnfollowed {
                            follower_id: follower,
                            followee_id: followee,
                        },
                    )
                    .await?;
                Ok(())
            });
        }
        Ok(removed)
    }

    pub async fn is_following(
        &self,
        follower: PrincipalId,
        followee: PrincipalId,
    ) -> AppResult<bool> {
        Ok(self.store.is_following(follower, followee).await?)
    }

    pub async fn followers(&self, principal: PrincipalId) -> AppResult<Vec<PrincipalId>> {
        Ok(self.store.list_followers(principal).await?)
    }

    pub async fn following(&self, principal: PrincipalId) -> AppResult<Vec<PrincipalId>> {
        Ok(self.store.list_following(principal).await?)
    }
}
