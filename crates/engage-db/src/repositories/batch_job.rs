//! PostgreSQL implementation of BatchJobRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{BatchJobQuery, BatchNotificationJob, BatchStatus};
use engage_core::traits::{BatchJobRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::mappers::BatchJobInsert;
use crate::models::BatchJobModel;

use super::error::{batch_job_not_found, map_db_error};

const JOB_COLUMNS: &str = "id, name, description, recipients, template, scheduled_for, status, \
     total_recipients, processed_recipients, progress, created_by, created_at, started_at, \
     completed_at, failed_at, error_message";

/// PostgreSQL implementation of BatchJobRepository
#[derive(Clone)]
pub struct PgBatchJobRepository {
    pool: PgPool,
}

impl PgBatchJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_jobs(rows: Vec<BatchJobModel>) -> RepoResult<Vec<BatchNotificationJob>> {
    rows.into_iter().map(BatchNotificationJob::try_from).collect()
}

#[async_trait]
impl BatchJobRepository for PgBatchJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &BatchNotificationJob) -> RepoResult<()> {
        let row = BatchJobInsert::new(job)?;

        sqlx::query(
            r#"
            INSERT INTO batch_notification_jobs
                (id, name, description, recipients, template, scheduled_for, status,
                 total_recipients, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(row.id)
        .bind(row.name)
        .bind(row.description)
        .bind(&row.recipients)
        .bind(&row.template)
        .bind(row.scheduled_for)
        .bind(row.status)
        .bind(row.total_recipients)
        .bind(row.created_by)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, id: Snowflake) -> RepoResult<Option<BatchNotificationJob>> {
        let model = sqlx::query_as::<_, BatchJobModel>(&format!(
            "SELECT {JOB_COLUMNS} FROM batch_notification_jobs WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        model.map(BatchNotificationJob::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &BatchJobQuery) -> RepoResult<Vec<BatchNotificationJob>> {
        let rows = sqlx::query_as::<_, BatchJobModel>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM batch_notification_jobs
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(query.status.map(BatchStatus::as_str))
        .bind(query.limit)
        .bind(query.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_jobs(rows)
    }

    #[instrument(skip(self))]
    async fn due(&self, now: DateTime<Utc>, limit: i64) -> RepoResult<Vec<BatchNotificationJob>> {
        let rows = sqlx::query_as::<_, BatchJobModel>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM batch_notification_jobs
            WHERE status = 'pending' AND scheduled_for <= $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        into_jobs(rows)
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, next = %job.status))]
    async fn compare_and_set(
        &self,
        job: &BatchNotificationJob,
        expected: BatchStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE batch_notification_jobs
            SET status = $3,
                processed_recipients = $4,
                progress = $5,
                started_at = $6,
                completed_at = $7,
                failed_at = $8,
                error_message = $9
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(job.id.into_inner())
        .bind(expected.as_str())
        .bind(job.status.as_str())
        .bind(job.processed_recipients)
        .bind(job.progress)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.failed_at)
        .bind(job.error_message.as_deref())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn record_progress(
        &self,
        id: Snowflake,
        processed: i64,
        progress: i32,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE batch_notification_jobs
            SET processed_recipients = $2, progress = $3
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .bind(processed)
        .bind(progress)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(batch_job_not_found(id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgBatchJobRepository>();
    }
}
