//! PostgreSQL implementation of NotificationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{InboxQuery, Notification};
use engage_core::traits::{NotificationRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::mappers::NotificationInsert;
use crate::models::NotificationModel;

use super::error::map_db_error;

/// PostgreSQL implementation of NotificationRepository
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    #[instrument(skip(self, notification), fields(recipient = %notification.recipient_id, kind = %notification.kind))]
    async fn insert_unless_duplicate(&self, notification: &Notification) -> RepoResult<bool> {
        let row = NotificationInsert::new(notification);

        // notifications_unread_dedup_idx makes the duplicate check atomic
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, actor_id, kind, title, message,
                                       related_id, related_type, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(row.id)
        .bind(row.recipient_id)
        .bind(row.actor_id)
        .bind(row.kind)
        .bind(row.title)
        .bind(row.message)
        .bind(row.related_id)
        .bind(row.related_type)
        .bind(row.metadata)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &InboxQuery) -> RepoResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationModel>(
            r#"
            SELECT id, recipient_id, actor_id, kind, title, message, related_id,
                   related_type, metadata, created_at, read_at
            FROM notifications
            WHERE recipient_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.recipient_id.into_inner())
        .bind(query.unread_only)
        .bind(query.limit)
        .bind(query.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn unread_count(&self, recipient_id: Snowflake) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(recipient_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }

    #[instrument(skip(self, ids))]
    async fn mark_read(
        &self,
        recipient_id: Snowflake,
        ids: Option<&[Snowflake]>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let ids: Option<Vec<i64>> = ids.map(|ids| ids.iter().map(|id| id.into_inner()).collect());

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read_at = $2
            WHERE recipient_id = $1
              AND read_at IS NULL
              AND ($3::BIGINT[] IS NULL OR id = ANY($3))
            "#,
        )
        .bind(recipient_id.into_inner())
        .bind(now)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
