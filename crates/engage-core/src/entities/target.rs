//! Engagement targets - anything users can react to or bookmark

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ReactionKind;
use crate::error::DomainError;
use crate::value_objects::{Scope, Snowflake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
    Poll,
    User,
    Group,
    Event,
}

impl TargetType {
    pub const ALL: [TargetType; 6] = [
        Self::Post,
        Self::Comment,
        Self::Poll,
        Self::User,
        Self::Group,
        Self::Event,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Poll => "poll",
            Self::User => "user",
            Self::Group => "group",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown target type: {s}")))
    }
}

/// Identity of a target: `(targetType, targetId)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: Snowflake,
}

impl TargetRef {
    pub fn new(target_type: TargetType, target_id: Snowflake) -> Self {
        Self {
            target_type,
            target_id,
        }
    }

    pub fn post(id: Snowflake) -> Self {
        Self::new(TargetType::Post, id)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_type, self.target_id)
    }
}

/// Per-kind reaction totals for one target
pub type ReactionCounts = BTreeMap<ReactionKind, i64>;

/// A target together with its denormalized counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementTarget {
    #[serde(flatten)]
    pub target: TargetRef,
    /// Author of the post/comment/poll, if any; receives engagement notifications
    pub owner_id: Option<Snowflake>,
    pub scope: Scope,
    /// Short text used in notification previews
    pub preview: Option<String>,
    pub like_count: i64,
    pub bookmark_count: i64,
    pub reaction_counts: ReactionCounts,
}

impl EngagementTarget {
    pub fn new(target: TargetRef, owner_id: Option<Snowflake>, scope: Scope) -> Self {
        Self {
            target,
            owner_id,
            scope,
            preview: None,
            like_count: 0,
            bookmark_count: 0,
            reaction_counts: ReactionCounts::new(),
        }
    }

    #[must_use]
    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn reaction_count(&self, kind: ReactionKind) -> i64 {
        self.reaction_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Apply a signed delta to one reaction counter, flooring at zero.
    /// Returns the new value. Keeps `like_count` in step with the `like` bucket.
    pub fn apply_reaction_delta(&mut self, kind: ReactionKind, delta: i64) -> i64 {
        let slot = self.reaction_counts.entry(kind).or_insert(0);
        *slot = (*slot + delta).max(0);
        let value = *slot;
        if kind == ReactionKind::Like {
            self.like_count = value;
        }
        value
    }

    pub fn apply_bookmark_delta(&mut self, delta: i64) -> i64 {
        self.bookmark_count = (self.bookmark_count + delta).max(0);
        self.bookmark_count
    }
}

/// Result of a toggle: whether the edge now exists and the counter after the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub active: bool,
    pub new_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_type_parse() {
        assert_eq!("post".parse::<TargetType>().unwrap(), TargetType::Post);
        assert_eq!("event".parse::<TargetType>().unwrap(), TargetType::Event);
        assert!("lecture".parse::<TargetType>().unwrap_err().is_validation());
    }

    #[test]
    fn test_like_count_follows_like_bucket() {
        let mut target = EngagementTarget::new(TargetRef::post(Snowflake::new(1)), None, Scope::default());
        assert_eq!(target.apply_reaction_delta(ReactionKind::Like, 1), 1);
        assert_eq!(target.apply_reaction_delta(ReactionKind::Love, 1), 1);
        assert_eq!(target.like_count, 1);
        assert_eq!(target.apply_reaction_delta(ReactionKind::Like, -1), 0);
        assert_eq!(target.like_count, 0);
        assert_eq!(target.reaction_count(ReactionKind::Love), 1);
    }

    #[test]
    fn test_counters_never_go_negative() {
        let mut target = EngagementTarget::new(TargetRef::post(Snowflake::new(1)), None, Scope::default());
        assert_eq!(target.apply_reaction_delta(ReactionKind::Sad, -1), 0);
        assert_eq!(target.apply_bookmark_delta(-3), 0);
    }
}
