// ============================================================================
// Configuration Constants
// ============================================================================

// Default port values
pub(crate) const DEFAULT_PORT: u16 = 8080;

// Default pool settings
pub(crate) const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub(crate) const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
pub(crate) const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub(crate) const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 600;

// Default realtime settings
pub(crate) const DEFAULT_MAX_TOPICS_PER_SESSION: usize = 64;
pub(crate) const DEFAULT_FOLLOW_UP_TIMEOUT_MS: u64 = 5000;

// Content limits (in characters)
pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_NOTIFICATION_CONTENT_LENGTH: usize = 280;

// WebSocket frame limit (in bytes)
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

// Paging
pub const MAX_PAGE_SIZE: u32 = 100;
