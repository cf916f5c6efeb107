// ============================================================================
// Topic Registry
// ============================================================================
//
// In-memory map from topics to the sessions currently subscribed to them.
//
// Locking:
// - `sessions` and `topics` are short-lived index locks, never held across
//   an await on another lock except in the order state -> topics.
// - Each session owns a Mutex over its own topic set. Every mutation of a
//   session's membership takes that mutex first, so changes to one session
//   are serialized while distinct sessions proceed independently.
// - A session marked `closed` accepts no further subscriptions; this keeps a
//   subscribe racing an unregister from leaving a dangling index entry.
//
// Only the inbox topic is attached on register. Content-room memberships are
// dropped with the session and must be re-established after a reconnect.
// ============================================================================

use murmur_error::{AppError, AppResult};
use murmur_types::{EventEnvelope, PrincipalId, SessionId, Topic};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Outbound channel of one session
pub type EventSender = mpsc::UnboundedSender<Arc<EventEnvelope>>;

struct SessionState {
    topics: HashSet<Topic>,
    closed: bool,
}

struct SessionEntry {
    principal_id: PrincipalId,
    sender: EventSender,
    state: Mutex<SessionState>,
}

/// A session captured by [`TopicRegistry::publish`]
#[derive(Clone)]
pub struct Subscriber {
    pub session_id: SessionId,
    pub principal_id: PrincipalId,
    pub sender: EventSender,
}

pub struct TopicRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
    topics: RwLock<HashMap<Topic, HashSet<SessionId>>>,
    max_topics_per_session: usize,
}

impl TopicRegistry {
    pub fn new(max_topics_per_session: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            topics: RwLock::new(HashMap::new()),
            max_topics_per_session: max_topics_per_session.max(1),
        }
    }

    /// Create a session and attach it to its principal's inbox
    pub async fn register(
        &self,
        session_id: SessionId,
        principal_id: PrincipalId,
        sender: EventSender,
    ) -> AppResult<()> {
        let inbox = Topic::inbox(principal_id);
        let entry = Arc::new(SessionEntry {
            principal_id,
            sender,
            state: Mutex::new(SessionState {
                topics: HashSet::from([inbox]),
                closed: false,
            }),
        });

        // Hold the new session's own lock until it is indexed, so nothing
        // can observe it half-registered.
        let _guard = entry.state.lock().await;
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session_id) {
                return Err(AppError::conflict(format!(
                    "session {} already registered",
                    session_id
                )));
            }
            sessions.insert(session_id, entry.clone());
        }
        self.topics
            .write()
            .await
            .entry(inbox)
            .or_default()
            .insert(session_id);

        murmur_metrics::ACTIVE_SESSIONS.inc();
        murmur_metrics::SESSIONS_TOTAL.inc();
        Ok(())
    }

    /// Attach a session to a topic. Returns false if it was already attached.
    pub async fn subscribe(&self, session_id: SessionId, topic: Topic) -> AppResult<bool> {
        let entry = self.entry(session_id).await?;
        if topic.is_inbox() && topic.owner_id() != entry.principal_id {
            return Err(AppError::forbidden("cannot subscribe to another user's inbox"));
        }

        let mut state = entry.state.lock().await;
        if state.closed {
            return Err(session_gone(session_id));
        }
        if state.topics.contains(&topic) {
            return Ok(false);
        }
        if state.topics.len() >= self.max_topics_per_session {
            return Err(AppError::validation(format!(
                "session is limited to {} topics",
                self.max_topics_per_session
            )));
        }

        state.topics.insert(topic);
        self.topics
            .write()
            .await
            .entry(topic)
            .or_default()
            .insert(session_id);
        drop(state);

        murmur_metrics::TOPIC_MEMBERSHIP_CHANGES
            .with_label_values(&[topic.family(), "subscribe"])
            .inc();
        Ok(true)
    }

    /// Detach a session from a topic. Returns false if it was not attached.
    pub async fn unsubscribe(&self, session_id: SessionId, topic: Topic) -> AppResult<bool> {
        let entry = self.entry(session_id).await?;
        if topic == Topic::inbox(entry.principal_id) {
            return Err(AppError::validation("cannot leave your own inbox"));
        }

        let mut state = entry.state.lock().await;
        if state.closed || !state.topics.remove(&topic) {
            return Ok(false);
        }
        self.detach(session_id, &topic).await;
        drop(state);

        murmur_metrics::TOPIC_MEMBERSHIP_CHANGES
            .with_label_values(&[topic.family(), "unsubscribe"])
            .inc();
        Ok(true)
    }

    /// Remove a session and every membership it held. Unknown ids are a no-op.
    pub async fn unregister(&self, session_id: SessionId) -> bool {
        let Some(entry) = self.sessions.write().await.remove(&session_id) else {
            return false;
        };

        let mut state = entry.state.lock().await;
        state.closed = true;
        for topic in state.topics.drain() {
            self.detach(session_id, &topic).await;
        }
        drop(state);

        murmur_metrics::ACTIVE_SESSIONS.dec();
        true
    }

    /// Snapshot of the sessions subscribed to `topic` right now.
    ///
    /// Sessions that join after the snapshot is taken do not see the event;
    /// there is no replay.
    pub async fn publish(&self, topic: &Topic) -> Vec<Subscriber> {
        let ids: Vec<SessionId> = match self.topics.read().await.get(topic) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Vec::new(),
        };

        let sessions = self.sessions.read().await;
        ids.into_iter()
            .filter_map(|session_id| {
                sessions.get(&session_id).map(|entry| Subscriber {
                    session_id,
                    principal_id: entry.principal_id,
                    sender: entry.sender.clone(),
                })
            })
            .collect()
    }

    pub async fn session_topics(&self, session_id: SessionId) -> AppResult<Vec<Topic>> {
        let entry = self.entry(session_id).await?;
        let state = entry.state.lock().await;
        let mut topics: Vec<Topic> = state.topics.iter().copied().collect();
        topics.sort_by_key(|t| t.to_string());
        Ok(topics)
    }

    /// Whether at least one session of `principal` is connected
    pub async fn is_online(&self, principal: PrincipalId) -> bool {
        self.topics
            .read()
            .await
            .get(&Topic::inbox(principal))
            .is_some_and(|ids| !ids.is_empty())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn entry(&self, session_id: SessionId) -> AppResult<Arc<SessionEntry>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| session_gone(session_id))
    }

    async fn detach(&self, session_id: SessionId, topic: &Topic) {
        let mut topics = self.topics.write().await;
        if let Some(ids) = topics.get_mut(topic) {
            ids.remove(&session_id);
            if ids.is_empty() {
                topics.remove(topic);
            }
        }
    }
}

fn session_gone(session_id: SessionId) -> AppError {
    AppError::not_found(format!("session {}", session_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn channel() -> (EventSender, mpsc::UnboundedReceiver<Arc<EventEnvelope>>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_register_attaches_inbox_only() {
        let registry = TopicRegistry::new(8);
        let (session, user) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx, _rx) = channel();

        registry.register(session, user, tx).await.unwrap();

        assert_eq!(
            registry.session_topics(session).await.unwrap(),
            vec![Topic::inbox(user)]
        );
        assert!(registry.is_online(user).await);
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts() {
        let registry = TopicRegistry::new(8);
        let session = Uuid::new_v4();
        let (tx, _rx) = channel();
        registry.register(session, Uuid::new_v4(), tx.clone()).await.unwrap();

        let err = registry
            .register(session, Uuid::new_v4(), tx)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_topic_limit() {
        let registry = TopicRegistry::new(2);
        let session = Uuid::new_v4();
        let (tx, _rx) = channel();
        registry.register(session, Uuid::new_v4(), tx).await.unwrap();

        assert!(registry
            .subscribe(session, Topic::room(Uuid::new_v4()))
            .await
            .unwrap());
        let err = registry
            .subscribe(session, Topic::room(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_noop() {
        let registry = TopicRegistry::new(8);
        assert!(!registry.unregister(Uuid::new_v4()).await);
        assert_eq!(registry.session_count().await, 0);
    }
}
