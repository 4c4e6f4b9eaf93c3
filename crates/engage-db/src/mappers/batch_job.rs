//! Batch job entity <-> model mapper

use engage_core::entities::{BatchNotificationJob, BatchStatus, NotificationTemplate};
use engage_core::error::DomainError;
use engage_core::value_objects::Snowflake;

use super::corrupt;
use crate::models::BatchJobModel;

impl TryFrom<BatchJobModel> for BatchNotificationJob {
    type Error = DomainError;

    fn try_from(model: BatchJobModel) -> Result<Self, Self::Error> {
        let status: BatchStatus = model.status.parse().map_err(|e| corrupt("status", e))?;
        let template: NotificationTemplate =
            serde_json::from_value(model.template).map_err(|e| corrupt("template", e))?;

        Ok(BatchNotificationJob {
            id: Snowflake::new(model.id),
            name: model.name,
            description: model.description,
            recipients: model.recipients.into_iter().map(Snowflake::new).collect(),
            template,
            scheduled_for: model.scheduled_for,
            status,
            total_recipients: model.total_recipients,
            processed_recipients: model.processed_recipients,
            progress: model.progress,
            created_by: Snowflake::new(model.created_by),
            created_at: model.created_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            failed_at: model.failed_at,
            error_message: model.error_message,
        })
    }
}

pub struct BatchJobInsert<'a> {
    pub id: i64,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub recipients: Vec<i64>,
    pub template: serde_json::Value,
    pub scheduled_for: chrono::DateTime<chrono::Utc>,
    pub status: &'static str,
    pub total_recipients: i64,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> BatchJobInsert<'a> {
    pub fn new(job: &'a BatchNotificationJob) -> Result<Self, DomainError> {
        let template = serde_json::to_value(&job.template)
            .map_err(|e| DomainError::InternalError(format!("template encoding: {e}")))?;

        Ok(Self {
            id: job.id.into_inner(),
            name: &job.name,
            description: job.description.as_deref(),
            recipients: job.recipients.iter().map(|r| r.into_inner()).collect(),
            template,
            scheduled_for: job.scheduled_for,
            status: job.status.as_str(),
            total_recipients: job.total_recipients,
            created_by: job.created_by.into_inner(),
            created_at: job.created_at,
        })
    }
}
