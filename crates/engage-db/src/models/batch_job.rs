//! Batch notification job database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct BatchJobModel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub recipients: Vec<i64>,
    /// Serialized `NotificationTemplate`
    pub template: serde_json::Value,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
    pub total_recipients: i64,
    pub processed_recipients: i64,
    pub progress: i32,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}
