//! Prometheus metrics for Murmur
//!
//! Provides centralized metrics collection for monitoring:
//! - Session lifecycle and topic membership
//! - Event fan-out (delivered / dropped / rejected)
//! - Engagement mutations and background notification follow-ups
//! - Direct messages

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    opts, register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

// ============================================================================
// Session Metrics
// ============================================================================

/// Currently registered sessions
pub static ACTIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "murmur_active_sessions",
        "Number of currently registered real-time sessions"
    ))
    .expect("Failed to register ACTIVE_SESSIONS metric")
});

/// Total number of sessions ever registered
pub static SESSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_sessions_total",
        "Total number of real-time sessions registered"
    ))
    .expect("Failed to register SESSIONS_TOTAL metric")
});

/// Topic subscription changes by family and action
pub static TOPIC_MEMBERSHIP_CHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "murmur_topic_membership_changes_total",
            "Topic subscribe/unsubscribe operations that changed membership"
        ),
        &["family", "action"]
    )
    .expect("Failed to register TOPIC_MEMBERSHIP_CHANGES metric")
});

// ============================================================================
// Fan-out Metrics
// ============================================================================

/// Events handed to a session channel, by event type
pub static EVENTS_DELIVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "murmur_events_delivered_total",
            "Events handed to a subscribed session"
        ),
        &["event"]
    )
    .expect("Failed to register EVENTS_DELIVERED metric")
});

/// Events that could not be handed to a session (closed channel)
pub static EVENTS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_events_dropped_total",
        "Events dropped because the session channel was closed"
    ))
    .expect("Failed to register EVENTS_DROPPED metric")
});

/// Events rejected by the fan-out schema check
pub static EVENTS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_events_rejected_total",
        "Events rejected at the fan-out boundary"
    ))
    .expect("Failed to register EVENTS_REJECTED metric")
});

/// Number of sessions reached per emit
pub static FANOUT_WIDTH: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "murmur_fanout_width",
        "Number of sessions reached by a single emit",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0]
    )
    .expect("Failed to register FANOUT_WIDTH metric")
});

// ============================================================================
// Engagement Metrics
// ============================================================================

/// Like/unlike operations that changed state, by target and action
pub static LIKE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "murmur_like_transitions_total",
            "Like state transitions that were applied"
        ),
        &["target", "action"]
    )
    .expect("Failed to register LIKE_TRANSITIONS metric")
});

/// Like/unlike calls that were no-ops (already in requested state)
pub static LIKE_NOOPS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_like_noops_total",
        "Like/unlike calls that found the target already in the requested state"
    ))
    .expect("Failed to register LIKE_NOOPS metric")
});

/// Comments created
pub static COMMENTS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_comments_created_total",
        "Total number of comments created"
    ))
    .expect("Failed to register COMMENTS_CREATED metric")
});

/// Comments removed, replies included
pub static COMMENTS_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_comments_removed_total",
        "Total number of comments removed, cascaded replies included"
    ))
    .expect("Failed to register COMMENTS_REMOVED metric")
});

// ============================================================================
// Notification Metrics
// ============================================================================

/// Notifications persisted, by kind
pub static NOTIFICATIONS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "murmur_notifications_created_total",
            "Notifications persisted"
        ),
        &["kind"]
    )
    .expect("Failed to register NOTIFICATIONS_CREATED metric")
});

/// Notifications skipped because actor == recipient
pub static NOTIFICATIONS_SUPPRESSED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_notifications_suppressed_total",
        "Notifications skipped for self-actions"
    ))
    .expect("Failed to register NOTIFICATIONS_SUPPRESSED metric")
});

/// Background follow-ups that failed or timed out
pub static FOLLOW_UP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_follow_up_failures_total",
        "Background notification/emit follow-ups that failed"
    ))
    .expect("Failed to register FOLLOW_UP_FAILURES metric")
});

// ============================================================================
// Message Metrics
// ============================================================================

/// Total number of direct messages appended
pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_messages_sent_total",
        "Total number of direct messages appended"
    ))
    .expect("Failed to register MESSAGES_SENT_TOTAL metric")
});

/// Messages flipped to seen
pub static MESSAGES_SEEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_messages_seen_total",
        "Total number of messages marked seen"
    ))
    .expect("Failed to register MESSAGES_SEEN_TOTAL metric")
});

/// Conversations created (insert won the pair-key race)
pub static CONVERSATIONS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_conversations_created_total",
        "Conversations created"
    ))
    .expect("Failed to register CONVERSATIONS_CREATED metric")
});

/// Conversation inserts that lost the pair-key race and re-fetched
pub static CONVERSATION_RACES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "murmur_conversation_races_total",
        "Conversation creations that collapsed onto an existing pair"
    ))
    .expect("Failed to register CONVERSATION_RACES metric")
});

/// Render every registered metric in the Prometheus text format
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
