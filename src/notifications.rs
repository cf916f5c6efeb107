// ============================================================================
// Notification Center
// ============================================================================
//
// Read side of the notification inbox. Every call is scoped to the receiver:
// a notification owned by someone else looks exactly like a missing one.
// ============================================================================

use murmur_db::{NotificationStore, Store};
use murmur_error::{AppError, AppResult};
use murmur_types::{Notification, Page, PrincipalId, RealtimeEvent, Topic};
use std::sync::Arc;
use uuid::Uuid;

use crate::fanout::EventFanout;
use crate::utils::clamp_page;

pub struct NotificationCenter {
    store: Arc<dyn Store>,
    fanout: Arc<EventFanout>,
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn Store>, fanout: Arc<EventFanout>) -> Self {
        Self { store, fanout }
    }

    /// Newest first
    pub async fn list(&self, receiver: PrincipalId, page: Page) -> AppResult<Vec<Notification>> {
        Ok(self.store.list_notifications(receiver, clamp_page(page)).await?)
    }

    pub async fn unread_count(&self, receiver: PrincipalId) -> AppResult<u64> {
        Ok(self.store.unread_notification_count(receiver).await?)
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        receiver: PrincipalId,
    ) -> AppResult<Notification> {
        let notification = self
            .store
            .mark_notification_read(notification_id, receiver)
            .await?
            .ok_or_else(|| AppError::not_found(format!("notification {}", notification_id)))?;

        self.announce_read(receiver, Some(notification_id));
        Ok(notification)
    }

    /// Returns how many notifications flipped to read
    pub async fn mark_all_read(&self, receiver: PrincipalId) -> AppResult<u64> {
        let updated = self.store.mark_all_notifications_read(receiver).await?;
        if updated > 0 {
            self.announce_read(receiver, None);
        }
        Ok(updated)
    }

    pub async fn delete(&self, notification_id: Uuid, receiver: PrincipalId) -> AppResult<()> {
        if !self
            .store
            .delete_notification(notification_id, receiver)
            .await?
        {
            return Err(AppError::not_found(format!(
                "notification {}",
                notification_id
            )));
        }
        Ok(())
    }

    /// Let the receiver's other sessions sync their badge
    fn announce_read(&self, receiver: PrincipalId, notification_id: Option<Uuid>) {
        let fanout = self.fanout.clone();
        self.fanout.spawn_follow_up("notification_read", async move {
            fanout
                .emit(
                    Topic::inbox(receiver),
                    RealtimeEvent::NotificationRead {
                        receiver_id: receiver,
                        notification_id,
                    },
                )
                .await?;
            Ok(())
        });
    }
}
