//! Engagement events - inputs to the notification dispatcher
//!
//! Each variant maps to exactly one notification template. Turning an event
//! into drafts is pure; persistence and dedup happen in the service layer.

use serde::{Deserialize, Serialize};

use crate::entities::{
    preview, NotificationDraft, NotificationKind, ReactionKind, RelatedType,
};
use crate::value_objects::Snowflake;

/// Who performed the action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: Snowflake,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(id: Snowflake) -> Self {
        Self {
            id,
            display_name: None,
        }
    }

    fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Someone")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementEvent {
    #[serde(rename_all = "camelCase")]
    Reacted {
        actor: Actor,
        owner_id: Snowflake,
        post_id: Snowflake,
        kind: ReactionKind,
        #[serde(default)]
        content: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Commented {
        actor: Actor,
        owner_id: Snowflake,
        post_id: Snowflake,
        comment_id: Snowflake,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Replied {
        actor: Actor,
        owner_id: Snowflake,
        comment_id: Snowflake,
        reply_id: Snowflake,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Mentioned {
        actor: Actor,
        mentioned: Vec<Snowflake>,
        related_id: Snowflake,
        related_type: RelatedType,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Shared {
        actor: Actor,
        owner_id: Snowflake,
        post_id: Snowflake,
    },
    #[serde(rename_all = "camelCase")]
    Followed { actor: Actor, followed_id: Snowflake },
    #[serde(rename_all = "camelCase")]
    GroupInvited {
        actor: Actor,
        invitee_id: Snowflake,
        group_id: Snowflake,
        group_name: String,
    },
    #[serde(rename_all = "camelCase")]
    EventReminder {
        recipient_id: Snowflake,
        event_id: Snowflake,
        event_title: String,
        #[serde(default)]
        starts_in: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PollVoted {
        actor: Actor,
        owner_id: Snowflake,
        poll_id: Snowflake,
        poll_title: String,
    },
}

impl EngagementEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Reacted {
                kind: ReactionKind::Like,
                ..
            } => NotificationKind::Like,
            Self::Reacted { .. } => NotificationKind::Reaction,
            Self::Commented { .. } => NotificationKind::Comment,
            Self::Replied { .. } => NotificationKind::Reply,
            Self::Mentioned { .. } => NotificationKind::Mention,
            Self::Shared { .. } => NotificationKind::Share,
            Self::Followed { .. } => NotificationKind::Follow,
            Self::GroupInvited { .. } => NotificationKind::GroupInvite,
            Self::EventReminder { .. } => NotificationKind::EventReminder,
            Self::PollVoted { .. } => NotificationKind::PollVote,
        }
    }

    /// The acting user; system events (reminders) have none
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Self::Reacted { actor, .. }
            | Self::Commented { actor, .. }
            | Self::Replied { actor, .. }
            | Self::Mentioned { actor, .. }
            | Self::Shared { actor, .. }
            | Self::Followed { actor, .. }
            | Self::GroupInvited { actor, .. }
            | Self::PollVoted { actor, .. } => Some(actor),
            Self::EventReminder { .. } => None,
        }
    }

    /// Render one draft per recipient, never addressing the actor
    pub fn drafts(&self) -> Vec<NotificationDraft> {
        let kind = self.kind();
        let actor_id = self.actor().map(|a| a.id);
        let name = self.actor().map_or("", Actor::name);

        let (recipients, message, related_id, related_type): (Vec<Snowflake>, String, Snowflake, Option<RelatedType>) =
            match self {
                Self::Reacted {
                    owner_id,
                    post_id,
                    kind: reaction,
                    content,
                    ..
                } => {
                    let verb = if *reaction == ReactionKind::Like {
                        "liked your post".to_string()
                    } else {
                        format!("reacted {reaction} to your post")
                    };
                    let message = match content {
                        Some(c) => format!("{name} {verb}: \"{}\"", preview(c)),
                        None => format!("{name} {verb}"),
                    };
                    (vec![*owner_id], message, *post_id, Some(RelatedType::Post))
                }
                Self::Commented {
                    owner_id,
                    post_id,
                    content,
                    ..
                } => (
                    vec![*owner_id],
                    format!("{name} commented: \"{}\"", preview(content)),
                    *post_id,
                    Some(RelatedType::Post),
                ),
                Self::Replied {
                    owner_id,
                    comment_id,
                    content,
                    ..
                } => (
                    vec![*owner_id],
                    format!("{name} replied: \"{}\"", preview(content)),
                    *comment_id,
                    Some(RelatedType::Comment),
                ),
                Self::Mentioned {
                    mentioned,
                    related_id,
                    related_type,
                    content,
                    ..
                } => (
                    mentioned.clone(),
                    format!("{name} mentioned you: \"{}\"", preview(content)),
                    *related_id,
                    Some(*related_type),
                ),
                Self::Shared {
                    owner_id, post_id, ..
                } => (
                    vec![*owner_id],
                    format!("{name} shared your post"),
                    *post_id,
                    Some(RelatedType::Post),
                ),
                Self::Followed { actor, followed_id } => (
                    vec![*followed_id],
                    format!("{name} started following you"),
                    actor.id,
                    None,
                ),
                Self::GroupInvited {
                    invitee_id,
                    group_id,
                    group_name,
                    ..
                } => (
                    vec![*invitee_id],
                    format!("{name} invited you to join {group_name}"),
                    *group_id,
                    Some(RelatedType::Group),
                ),
                Self::EventReminder {
                    recipient_id,
                    event_id,
                    event_title,
                    starts_in,
                } => (
                    vec![*recipient_id],
                    match starts_in {
                        Some(when) => format!("{event_title} starts {when}"),
                        None => format!("{event_title} is coming up"),
                    },
                    *event_id,
                    Some(RelatedType::Event),
                ),
                Self::PollVoted {
                    owner_id,
                    poll_id,
                    poll_title,
                    ..
                } => (
                    vec![*owner_id],
                    format!("{name} voted on your poll: \"{}\"", preview(poll_title)),
                    *poll_id,
                    Some(RelatedType::Poll),
                ),
            };

        let mut seen = Vec::with_capacity(recipients.len());
        recipients
            .into_iter()
            .filter(|r| Some(*r) != actor_id)
            .filter(|r| {
                if seen.contains(r) {
                    false
                } else {
                    seen.push(*r);
                    true
                }
            })
            .map(|recipient_id| NotificationDraft {
                recipient_id,
                actor_id,
                kind,
                title: kind.title().to_string(),
                message: message.clone(),
                related_id: Some(related_id),
                related_type,
                metadata: serde_json::Value::Null,
            })
            .collect()
    }
}
