//! Change events - state-change notices pushed to realtime subscribers
//!
//! Subscribers re-fetch on reconnect, so a change event is a notice, not a
//! durable log record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Scope, Snowflake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Target,
    Reaction,
    Bookmark,
    Poll,
    Notification,
    BatchJob,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Reaction => "reaction",
            Self::Bookmark => "bookmark",
            Self::Poll => "poll",
            Self::Notification => "notification",
            Self::BatchJob => "batch_job",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub entity_type: EntityType,
    /// Ordering key: events for one entity id are delivered in publish order
    pub entity_id: Snowflake,
    pub entity: serde_json::Value,
    #[serde(default)]
    pub scope: Scope,
    /// Set for personal events; only that user's subscriptions receive it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Snowflake>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        op: ChangeOp,
        entity_type: EntityType,
        entity_id: Snowflake,
        entity: serde_json::Value,
        scope: Scope,
    ) -> Self {
        Self {
            op,
            entity_type,
            entity_id,
            entity,
            scope,
            audience: None,
            timestamp: Utc::now(),
        }
    }

    pub fn insert(entity_type: EntityType, entity_id: Snowflake, entity: serde_json::Value, scope: Scope) -> Self {
        Self::new(ChangeOp::Insert, entity_type, entity_id, entity, scope)
    }

    pub fn update(entity_type: EntityType, entity_id: Snowflake, entity: serde_json::Value, scope: Scope) -> Self {
        Self::new(ChangeOp::Update, entity_type, entity_id, entity, scope)
    }

    pub fn delete(entity_type: EntityType, entity_id: Snowflake, entity: serde_json::Value, scope: Scope) -> Self {
        Self::new(ChangeOp::Delete, entity_type, entity_id, entity, scope)
    }

    #[must_use]
    pub fn for_audience(mut self, user_id: Snowflake) -> Self {
        self.audience = Some(user_id);
        self
    }
}
