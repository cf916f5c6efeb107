// ============================================================================
// Real-time Topics
// ============================================================================
//
// Two topic families exist:
// 1. user-inbox:<principal uuid>   - every session of that principal
// 2. content-room:<post uuid>      - sessions currently viewing a post
//
// Topics travel as plain strings on the wire and are parsed back here.
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const USER_INBOX_PREFIX: &str = "user-inbox:";
const CONTENT_ROOM_PREFIX: &str = "content-room:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Personal delivery channel of one principal
    UserInbox(Uuid),
    /// Shared channel of one piece of content (a post)
    ContentRoom(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("unknown topic family: {0}")]
    UnknownFamily(String),

    #[error("topic id is not a valid UUID: {0}")]
    InvalidId(String),
}

impl Topic {
    pub fn inbox(principal: Uuid) -> Self {
        Topic::UserInbox(principal)
    }

    pub fn room(content_id: Uuid) -> Self {
        Topic::ContentRoom(content_id)
    }

    pub fn is_inbox(&self) -> bool {
        matches!(self, Topic::UserInbox(_))
    }

    pub fn is_room(&self) -> bool {
        matches!(self, Topic::ContentRoom(_))
    }

    /// Id of the principal or content this topic belongs to
    pub fn owner_id(&self) -> Uuid {
        match self {
            Topic::UserInbox(id) | Topic::ContentRoom(id) => *id,
        }
    }

    /// Short family name, used as a metrics/log label
    pub fn family(&self) -> &'static str {
        match self {
            Topic::UserInbox(_) => "user-inbox",
            Topic::ContentRoom(_) => "content-room",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::UserInbox(id) => write!(f, "{}{}", USER_INBOX_PREFIX, id),
            Topic::ContentRoom(id) => write!(f, "{}{}", CONTENT_ROOM_PREFIX, id),
        }
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |raw: &str| {
            Uuid::parse_str(raw).map_err(|_| TopicError::InvalidId(raw.to_string()))
        };

        if let Some(rest) = s.strip_prefix(USER_INBOX_PREFIX) {
            Ok(Topic::UserInbox(parse(rest)?))
        } else if let Some(rest) = s.strip_prefix(CONTENT_ROOM_PREFIX) {
            Ok(Topic::ContentRoom(parse(rest)?))
        } else {
            Err(TopicError::UnknownFamily(s.to_string()))
        }
    }
}

impl Serialize for Topic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
