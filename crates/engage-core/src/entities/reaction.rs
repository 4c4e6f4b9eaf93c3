//! Reaction and bookmark edges

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TargetRef;
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// The closed set of reactions a user can leave
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 6] = [
        Self::Like,
        Self::Love,
        Self::Haha,
        Self::Wow,
        Self::Sad,
        Self::Angry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Haha => "haha",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown reaction type: {s}")))
    }
}

/// One user's reaction of one kind on one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEdge {
    pub user_id: Snowflake,
    pub target: TargetRef,
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

impl ReactionEdge {
    pub fn new(user_id: Snowflake, target: TargetRef, kind: ReactionKind) -> Self {
        Self {
            user_id,
            target,
            kind,
            created_at: Utc::now(),
        }
    }

    /// Key that must be unique across all reaction edges
    pub fn unique_key(&self) -> (Snowflake, TargetRef, ReactionKind) {
        (self.user_id, self.target, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkEdge {
    pub user_id: Snowflake,
    pub post_id: Snowflake,
    pub created_at: DateTime<Utc>,
}

impl BookmarkEdge {
    pub fn new(user_id: Snowflake, post_id: Snowflake) -> Self {
        Self {
            user_id,
            post_id,
            created_at: Utc::now(),
        }
    }
}
