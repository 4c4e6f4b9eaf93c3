//! Activity log entity <-> model mapper

use engage_core::entities::ActivityLogEntry;
use engage_core::value_objects::Snowflake;

use crate::models::ActivityLogModel;

impl From<ActivityLogModel> for ActivityLogEntry {
    fn from(model: ActivityLogModel) -> Self {
        ActivityLogEntry {
            id: Snowflake::new(model.id),
            user_id: model.user_id.map(Snowflake::new),
            action: model.action,
            resource_type: model.resource_type,
            resource_id: model.resource_id,
            details: model.details,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
        }
    }
}

pub struct ActivityInsert<'a> {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: Option<&'a str>,
    pub resource_type: Option<&'a str>,
    pub resource_id: Option<&'a str>,
    pub details: &'a serde_json::Value,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> ActivityInsert<'a> {
    pub fn new(entry: &'a ActivityLogEntry) -> Self {
        Self {
            id: entry.id.into_inner(),
            user_id: entry.user_id.map(Snowflake::into_inner),
            action: entry.action.as_deref(),
            resource_type: entry.resource_type.as_deref(),
            resource_id: entry.resource_id.as_deref(),
            details: &entry.details,
            ip_address: entry.ip_address.as_deref(),
            user_agent: entry.user_agent.as_deref(),
            created_at: entry.created_at,
        }
    }
}
