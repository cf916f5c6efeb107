use murmur_config::Config;
use murmur_db::Store;
use std::sync::Arc;
use std::time::Duration;

use crate::conversations::ConversationDirectory;
use crate::engagement::EngagementLedger;
use crate::fanout::EventFanout;
use crate::follows::FollowGraph;
use crate::messages::MessageService;
use crate::notifications::NotificationCenter;
use crate::registry::TopicRegistry;

/// Application context containing shared dependencies
///
/// Built once at startup and handed to routes and WebSocket sessions as
/// `Arc<AppContext>`. There are no module-level singletons besides metrics.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub registry: Arc<TopicRegistry>,
    pub fanout: Arc<EventFanout>,
    pub conversations: Arc<ConversationDirectory>,
    pub engagement: Arc<EngagementLedger>,
    pub messages: Arc<MessageService>,
    pub notifications: Arc<NotificationCenter>,
    pub follows: Arc<FollowGraph>,
}

impl AppContext {
    /// Wire every component on top of `store`
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>) -> Self {
        let registry = Arc::new(TopicRegistry::new(config.realtime.max_topics_per_session));
        let fanout = Arc::new(EventFanout::new(
            registry.clone(),
            store.clone(),
            Duration::from_millis(config.realtime.follow_up_timeout_ms),
            config.logging.clone(),
        ));
        let conversations = Arc::new(ConversationDirectory::new(store.clone()));
        let engagement = Arc::new(EngagementLedger::new(store.clone(), fanout.clone()));
        let messages = Arc::new(MessageService::new(
            store.clone(),
            conversations.clone(),
            fanout.clone(),
        ));
        let notifications = Arc::new(NotificationCenter::new(store.clone(), fanout.clone()));
        let follows = Arc::new(FollowGraph::new(store.clone(), fanout.clone()));

        Self {
            config,
            store,
            registry,
            fanout,
            conversations,
            engagement,
            messages,
            notifications,
            follows,
        }
    }
}
