// ============================================================================
// Realtime Configuration
// ============================================================================

use crate::constants::{DEFAULT_FOLLOW_UP_TIMEOUT_MS, DEFAULT_MAX_TOPICS_PER_SESSION};

#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    /// Upper bound on topics a single session may hold, inbox included
    pub max_topics_per_session: usize,
    /// Budget for one background follow-up (notification + emit)
    pub follow_up_timeout_ms: u64,
}

impl RealtimeConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            max_topics_per_session: std::env::var("MAX_TOPICS_PER_SESSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(DEFAULT_MAX_TOPICS_PER_SESSION),
            follow_up_timeout_ms: std::env::var("FOLLOW_UP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FOLLOW_UP_TIMEOUT_MS),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_topics_per_session: DEFAULT_MAX_TOPICS_PER_SESSION,
            follow_up_timeout_ms: DEFAULT_FOLLOW_UP_TIMEOUT_MS,
        }
    }
}
