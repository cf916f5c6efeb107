// ============================================================================
// Event Fan-out
// ============================================================================
//
// Delivers sealed events to every session currently subscribed to a topic,
// persists engagement notifications behind the self-action gate, and runs
// post-mutation follow-ups as detached tasks.
//
// Delivery is best-effort and at-most-current-subscribers: no retries, no
// queue. A closed session channel simply counts as a drop.
// ============================================================================

use chrono::Utc;
use murmur_config::{LoggingConfig, MAX_NOTIFICATION_CONTENT_LENGTH};
use murmur_db::{NotificationStore, Store};
use murmur_error::AppResult;
use murmur_types::{
    EventEnvelope, Notification, NotificationKind, PrincipalId, RealtimeEvent, Topic,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::registry::TopicRegistry;
use crate::utils::principal_label;

/// A notification that has not passed the self-action gate yet
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub actor: PrincipalId,
    pub recipient: PrincipalId,
    pub kind: NotificationKind,
    pub reference_id: Uuid,
    pub content: String,
}

impl NotificationDraft {
    fn into_notification(self) -> Notification {
        let content: String = self
            .content
            .chars()
            .take(MAX_NOTIFICATION_CONTENT_LENGTH)
            .collect();
        Notification {
            id: Uuid::new_v4(),
            receiver_id: self.recipient,
            sender_id: self.actor,
            kind: self.kind,
            reference_id: self.reference_id,
            content,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

pub struct EventFanout {
    registry: Arc<TopicRegistry>,
    store: Arc<dyn Store>,
    tracker: TaskTracker,
    draining: AtomicBool,
    follow_up_timeout: Duration,
    logging: LoggingConfig,
}

impl EventFanout {
    pub fn new(
        registry: Arc<TopicRegistry>,
        store: Arc<dyn Store>,
        follow_up_timeout: Duration,
        logging: LoggingConfig,
    ) -> Self {
        Self {
            registry,
            store,
            tracker: TaskTracker::new(),
            draining: AtomicBool::new(false),
            follow_up_timeout,
            logging,
        }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Validate `event` for `topic` and hand it to every current subscriber.
    /// Returns the number of sessions reached.
    pub async fn emit(&self, topic: Topic, event: RealtimeEvent) -> AppResult<usize> {
        let envelope = match EventEnvelope::seal(topic, event) {
            Ok(envelope) => Arc::new(envelope),
            Err(e) => {
                murmur_metrics::EVENTS_REJECTED.inc();
                tracing::error!(topic = %topic, error = %e, "Rejected event at fan-out");
                return Err(e.into());
            }
        };

        let subscribers = self.registry.publish(&topic).await;
        let mut delivered = 0usize;
        for subscriber in subscribers {
            if subscriber.sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            } else {
                murmur_metrics::EVENTS_DROPPED.inc();
                tracing::debug!(
                    session_id = %subscriber.session_id,
                    event = %envelope.event_type,
                    "Session channel closed, event dropped"
                );
            }
        }

        murmur_metrics::EVENTS_DELIVERED
            .with_label_values(&[envelope.event_type.as_str()])
            .inc_by(delivered as u64);
        murmur_metrics::FANOUT_WIDTH.observe(delivered as f64);
        tracing::trace!(
            topic = %topic,
            event = %envelope.event_type,
            delivered = delivered,
            "Event fanned out"
        );
        Ok(delivered)
    }

    /// Persist and push a notification unless the actor is the recipient.
    ///
    /// Every engagement-derived notification goes through here.
    pub async fn notify_if_not_self(
        &self,
        draft: NotificationDraft,
    ) -> AppResult<Option<Notification>> {
        if draft.actor == draft.recipient {
            murmur_metrics::NOTIFICATIONS_SUPPRESSED.inc();
            return Ok(None);
        }

        let notification = draft.into_notification();
        self.store.insert_notification(&notification).await?;
        murmur_metrics::NOTIFICATIONS_CREATED
            .with_label_values(&[notification.kind.as_str()])
            .inc();

        tracing::debug!(
            notification_id = %notification.id,
            kind = %notification.kind,
            receiver = %principal_label(&notification.receiver_id, &self.logging),
            "Notification stored"
        );

        self.emit(
            Topic::inbox(notification.receiver_id),
            RealtimeEvent::NotificationNew {
                notification: notification.clone(),
            },
        )
        .await?;
        Ok(Some(notification))
    }

    /// Run `work` as a detached task. Its failure is logged and counted but
    /// never reaches the caller of the primary mutation.
    pub fn spawn_follow_up<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        let timeout = self.follow_up_timeout;
        self.tracker.spawn(async move {
            match tokio::time::timeout(timeout, work).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    murmur_metrics::FOLLOW_UP_FAILURES.inc();
                    tracing::warn!(
                        follow_up = label,
                        error = %e,
                        error_code = e.error_code(),
                        "Follow-up failed"
                    );
                }
                Err(_) => {
                    murmur_metrics::FOLLOW_UP_FAILURES.inc();
                    tracing::warn!(
                        follow_up = label,
                        timeout_ms = timeout.as_millis() as u64,
                        "Follow-up timed out"
                    );
                }
            }
        });
    }

    /// Wait until every follow-up scheduled so far has finished. Never reopens
    /// the tracker once `shutdown` has started.
    #[doc(hidden)]
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.draining.load(Ordering::Acquire) {
            self.tracker.reopen();
        }
    }

    /// Stop accepting follow-ups and drain the ones in flight
    pub async fn shutdown(&self) {
        self.draining.store(true, Ordering::Release);
        self.tracker.close();
        tracing::info!(pending = self.tracker.len(), "Draining follow-ups");
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_config::LogFormat;
    use murmur_db::MemoryStore;
    use murmur_error::AppError;
    use murmur_types::Page;
    use tokio::sync::mpsc;

    fn logging() -> LoggingConfig {
        LoggingConfig {
            enable_user_identifiers: false,
            hash_salt: "fanout-test".to_string(),
            format: LogFormat::Text,
        }
    }

    fn fanout() -> (EventFanout, Arc<MemoryStore>, Arc<TopicRegistry>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(TopicRegistry::new(16));
        let fanout = EventFanout::new(
            registry.clone(),
            store.clone(),
            Duration::from_secs(1),
            logging(),
        );
        (fanout, store, registry)
    }

    #[tokio::test]
    async fn test_self_notification_suppressed() {
        let (fanout, store, _) = fanout();
        let user = Uuid::new_v4();

        let result = fanout
            .notify_if_not_self(NotificationDraft {
                actor: user,
                recipient: user,
                kind: NotificationKind::Like,
                reference_id: Uuid::new_v4(),
                content: "liked your post".into(),
            })
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(store
            .list_notifications(user, Page::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_emit_reaches_current_subscribers_only() {
        let (fanout, _, registry) = fanout();
        let room = Topic::room(Uuid::new_v4());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
        registry.register(s1, Uuid::new_v4(), tx1).await.unwrap();
        registry.register(s2, Uuid::new_v4(), tx2).await.unwrap();
        registry.subscribe(s1, room).await.unwrap();

        let delivered = fanout
            .emit(
                room,
                RealtimeEvent::PostLiked {
                    post_id: room.owner_id(),
                    actor_id: Uuid::new_v4(),
                    like_count: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(rx1.recv().await.unwrap().event_type, "post:liked");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_follow_up_is_swallowed() {
        let (fanout, _, _) = fanout();
        fanout.spawn_follow_up("test", async { Err(AppError::transient("store down")) });
        fanout.settle().await;
        // still usable after settling
        fanout.spawn_follow_up("test", async { Ok(()) });
        fanout.settle().await;
    }

    #[tokio::test]
    async fn test_settle_after_shutdown_keeps_tracker_closed() {
        let (fanout, _, _) = fanout();
        let (tx, rx) = tokio::sync::oneshot::channel();
        fanout.spawn_follow_up("test", async move {
            let _ = tx.send(());
            Ok(())
        });

        fanout.shutdown().await;
        fanout.settle().await;

        assert!(fanout.tracker.is_closed());
        assert!(fanout.tracker.is_empty());
        assert!(rx.await.is_ok());
        tokio::time::timeout(Duration::from_secs(1), fanout.tracker.wait())
            .await
            .expect("drained tracker should not block");
    }
}
