//! Notification records and their templates

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Maximum characters of user content quoted in a notification
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Reply,
    Mention,
    Share,
    Follow,
    GroupInvite,
    EventReminder,
    PollVote,
    Reaction,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 10] = [
        Self::Like,
        Self::Comment,
        Self::Reply,
        Self::Mention,
        Self::Share,
        Self::Follow,
        Self::GroupInvite,
        Self::EventReminder,
        Self::PollVote,
        Self::Reaction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Mention => "mention",
            Self::Share => "share",
            Self::Follow => "follow",
            Self::GroupInvite => "group_invite",
            Self::EventReminder => "event_reminder",
            Self::PollVote => "poll_vote",
            Self::Reaction => "reaction",
        }
    }

    /// Fixed title of the template for this kind
    pub fn title(self) -> &'static str {
        match self {
            Self::Like => "New Like on Your Post",
            Self::Comment => "New Comment on Your Post",
            Self::Reply => "New Reply to Your Comment",
            Self::Mention => "You Were Mentioned",
            Self::Share => "Your Post Was Shared",
            Self::Follow => "New Follower",
            Self::GroupInvite => "Group Invitation",
            Self::EventReminder => "Event Reminder",
            Self::PollVote => "New Vote on Your Poll",
            Self::Reaction => "New Reaction",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown notification type: {s}")))
    }
}

/// What a notification's `related_id` points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedType {
    Post,
    Comment,
    Group,
    Event,
    Poll,
    Reply,
}

impl RelatedType {
    pub const ALL: [RelatedType; 6] = [
        Self::Post,
        Self::Comment,
        Self::Group,
        Self::Event,
        Self::Poll,
        Self::Reply,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Group => "group",
            Self::Event => "event",
            Self::Poll => "poll",
            Self::Reply => "reply",
        }
    }
}

impl FromStr for RelatedType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown related type: {s}")))
    }
}

/// A notification before it has an id; produced by event templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient_id: Snowflake,
    pub actor_id: Option<Snowflake>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<Snowflake>,
    pub related_type: Option<RelatedType>,
    pub metadata: serde_json::Value,
}

impl NotificationDraft {
    /// Drafts are never addressed to their own actor
    pub fn is_self_notification(&self) -> bool {
        self.actor_id == Some(self.recipient_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Snowflake,
    pub recipient_id: Snowflake,
    pub actor_id: Option<Snowflake>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<Snowflake>,
    pub related_type: Option<RelatedType>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn from_draft(id: Snowflake, draft: NotificationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            recipient_id: draft.recipient_id,
            actor_id: draft.actor_id,
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            related_id: draft.related_id,
            related_type: draft.related_type,
            metadata: draft.metadata,
            created_at: now,
            read_at: None,
        }
    }

    #[inline]
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Two unread notifications with the same key are duplicates
    pub fn dedup_key(&self) -> (Snowflake, Option<Snowflake>, NotificationKind, Option<Snowflake>) {
        (self.recipient_id, self.actor_id, self.kind, self.related_id)
    }
}

/// Inbox query for one recipient
#[derive(Debug, Clone)]
pub struct InboxQuery {
    pub recipient_id: Snowflake,
    pub limit: i64,
    pub offset: i64,
    pub unread_only: bool,
}

/// Quote user content, cutting it at [`PREVIEW_CHARS`] characters
pub fn preview(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() > PREVIEW_CHARS {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}
