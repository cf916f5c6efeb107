// ============================================================================
// Murmur Types - Core Data Types
// ============================================================================
//
// This crate contains the data structures shared by every Murmur component.
// It has NO dependencies on business logic, databases, or transports.
//
// Contents:
// - Principal identifiers and pair keys
// - Real-time topics (user inbox, content room)
// - Durable records (posts, comments, conversations, messages, notifications)
// - The closed set of real-time events and their envelope
// - WebSocket client/server frames
//
// Dependencies:
// - serde (serialization only)
// - uuid (identifiers)
// - chrono (timestamps)
//
// ============================================================================

pub mod events;
pub mod ids;
pub mod models;
pub mod protocol;
pub mod topic;

// Re-exports for convenience
pub use events::*;
pub use ids::*;
pub use models::*;
pub use protocol::*;
pub use topic::*;
