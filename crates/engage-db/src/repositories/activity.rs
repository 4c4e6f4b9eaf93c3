//! PostgreSQL implementation of ActivityRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{ActivityFilter, ActivityLogEntry};
use engage_core::traits::{ActivityRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::mappers::ActivityInsert;
use crate::models::ActivityLogModel;

use super::error::map_db_error;

const FILTER_CLAUSE: &str = r#"
    ($1::TEXT IS NULL OR action = $1)
    AND ($2::TEXT IS NULL OR resource_type = $2)
    AND ($3::BIGINT IS NULL OR user_id = $3)
    AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4)
    AND ($5::TIMESTAMPTZ IS NULL OR created_at <= $5)
"#;

/// PostgreSQL implementation of ActivityRepository
#[derive(Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    #[instrument(skip(self, entry), fields(action = ?entry.action))]
    async fn append(&self, entry: &ActivityLogEntry) -> RepoResult<()> {
        let row = ActivityInsert::new(entry);

        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, user_id, action, resource_type, resource_id,
                                       details, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.action)
        .bind(row.resource_type)
        .bind(row.resource_id)
        .bind(row.details)
        .bind(row.ip_address)
        .bind(row.user_agent)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &ActivityFilter) -> RepoResult<(Vec<ActivityLogEntry>, i64)> {
        let user_id = filter.user_id.map(Snowflake::into_inner);

        let rows = sqlx::query_as::<_, ActivityLogModel>(&format!(
            r#"
            SELECT id, user_id, action, resource_type, resource_id, details,
                   ip_address, user_agent, created_at
            FROM activity_logs
            WHERE {FILTER_CLAUSE}
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.action.as_deref())
        .bind(filter.resource_type.as_deref())
        .bind(user_id)
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.limit)
        .bind(filter.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM activity_logs WHERE {FILTER_CLAUSE}"
        ))
        .bind(filter.action.as_deref())
        .bind(filter.resource_type.as_deref())
        .bind(user_id)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok((rows.into_iter().map(ActivityLogEntry::from).collect(), total))
    }

    #[instrument(skip(self))]
    async fn in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityLogModel>(
            r#"
            SELECT id, user_id, action, resource_type, resource_id, details,
                   ip_address, user_agent, created_at
            FROM activity_logs
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(ActivityLogEntry::from).collect())
    }
}
