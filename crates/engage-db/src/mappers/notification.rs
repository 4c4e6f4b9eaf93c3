//! Notification entity <-> model mapper

use engage_core::entities::{Notification, NotificationKind, RelatedType};
use engage_core::error::DomainError;
use engage_core::value_objects::Snowflake;

use super::corrupt;
use crate::models::NotificationModel;

impl TryFrom<NotificationModel> for Notification {
    type Error = DomainError;

    fn try_from(model: NotificationModel) -> Result<Self, Self::Error> {
        let kind: NotificationKind = model.kind.parse().map_err(|e| corrupt("kind", e))?;
        let related_type = model
            .related_type
            .as_deref()
            .map(str::parse::<RelatedType>)
            .transpose()
            .map_err(|e| corrupt("related_type", e))?;

        Ok(Notification {
            id: Snowflake::new(model.id),
            recipient_id: Snowflake::new(model.recipient_id),
            actor_id: model.actor_id.map(Snowflake::new),
            kind,
            title: model.title,
            message: model.message,
            related_id: model.related_id.map(Snowflake::new),
            related_type,
            metadata: model.metadata,
            created_at: model.created_at,
            read_at: model.read_at,
        })
    }
}

pub struct NotificationInsert<'a> {
    pub id: i64,
    pub recipient_id: i64,
    pub actor_id: Option<i64>,
    pub kind: &'static str,
    pub title: &'a str,
    pub message: &'a str,
    pub related_id: Option<i64>,
    pub related_type: Option<&'static str>,
    pub metadata: &'a serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> NotificationInsert<'a> {
    pub fn new(n: &'a Notification) -> Self {
        Self {
            id: n.id.into_inner(),
            recipient_id: n.recipient_id.into_inner(),
            actor_id: n.actor_id.map(Snowflake::into_inner),
            kind: n.kind.as_str(),
            title: &n.title,
            message: &n.message,
            related_id: n.related_id.map(Snowflake::into_inner),
            related_type: n.related_type.map(RelatedType::as_str),
            metadata: &n.metadata,
            created_at: n.created_at,
        }
    }
}
