// ============================================================================
// Identifiers
// ============================================================================
//
// Principals, sessions and all durable records are identified by UUIDs.
// The principal id arrives pre-validated from the identity layer; everything
// else that comes off the wire is parsed through `parse_id`.
//
// A PairKey is the order-independent identity of a two-party conversation:
// the two participant ids sorted and joined with ':'.
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Authenticated principal (user) id
pub type PrincipalId = Uuid;

/// Id of a single live connection
pub type SessionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{0} id is empty")]
    Empty(&'static str),

    #[error("{kind} id is not a valid UUID: {value}")]
    InvalidUuid { kind: &'static str, value: String },
}

/// Parse a wire identifier, naming the kind of record in the error
pub fn parse_id(kind: &'static str, value: &str) -> Result<Uuid, IdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty(kind));
    }
    Uuid::parse_str(trimmed).map_err(|_| IdError::InvalidUuid {
        kind,
        value: trimmed.to_string(),
    })
}

/// Canonical, order-independent key of an unordered participant pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    /// Build the key for two participants. Returns None when both are the same
    /// principal, since a conversation always has exactly two members.
    pub fn new(a: PrincipalId, b: PrincipalId) -> Option<Self> {
        if a == b {
            return None;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Some(Self(format!("{}:{}", low, high)))
    }

    /// Rebuild a key read back from storage
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
