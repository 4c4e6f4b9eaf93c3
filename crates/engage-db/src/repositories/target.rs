//! PostgreSQL implementation of TargetRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{EngagementTarget, TargetRef};
use engage_core::traits::{RepoResult, TargetRepository};

use crate::mappers::{reaction_counts, TargetInsert};
use crate::models::{ReactionCountModel, TargetModel};

use super::error::{map_db_error, target_not_found};

/// PostgreSQL implementation of TargetRepository
#[derive(Clone)]
pub struct PgTargetRepository {
    pool: PgPool,
}

impl PgTargetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetRepository for PgTargetRepository {
    #[instrument(skip(self, target), fields(target = %target.target))]
    async fn upsert(&self, target: &EngagementTarget) -> RepoResult<()> {
        let row = TargetInsert::new(target);

        // Re-registering a deleted target revives it; counters survive.
        sqlx::query(
            r#"
            INSERT INTO engagement_targets
                (target_type, target_id, owner_id, campus_id, department_id, batch, preview)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (target_type, target_id) DO UPDATE
            SET owner_id = EXCLUDED.owner_id,
                campus_id = EXCLUDED.campus_id,
                department_id = EXCLUDED.department_id,
                batch = EXCLUDED.batch,
                preview = EXCLUDED.preview,
                deleted_at = NULL
            "#,
        )
        .bind(row.target_type)
        .bind(row.target_id)
        .bind(row.owner_id)
        .bind(row.campus_id)
        .bind(row.department_id)
        .bind(row.batch)
        .bind(row.preview)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, target: TargetRef) -> RepoResult<Option<EngagementTarget>> {
        let model = sqlx::query_as::<_, TargetModel>(
            r#"
            SELECT target_type, target_id, owner_id, campus_id, department_id, batch,
                   preview, like_count, bookmark_count
            FROM engagement_targets
            WHERE target_type = $1 AND target_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(target.target_type.as_str())
        .bind(target.target_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(model) = model else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, ReactionCountModel>(
            r#"
            SELECT kind, count
            FROM target_reaction_counts
            WHERE target_type = $1 AND target_id = $2
            "#,
        )
        .bind(target.target_type.as_str())
        .bind(target.target_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut entity = EngagementTarget::try_from(model)?;
        entity.reaction_counts = reaction_counts(rows)?;
        Ok(Some(entity))
    }

    #[instrument(skip(self))]
    async fn delete(&self, target: TargetRef) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE engagement_targets
            SET deleted_at = NOW()
            WHERE target_type = $1 AND target_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(target.target_type.as_str())
        .bind(target.target_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(target_not_found(target));
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
        assert_send_sync::<PgTargetRepository>();
    }
}
