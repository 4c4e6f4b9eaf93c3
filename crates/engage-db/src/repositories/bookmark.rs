//! PostgreSQL implementation of BookmarkRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{BookmarkEdge, TargetRef, ToggleOutcome};
use engage_core::error::DomainError;
use engage_core::traits::{BookmarkRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::models::BookmarkModel;

use super::error::map_db_error;
use super::reaction::lock_target;

/// PostgreSQL implementation of BookmarkRepository
#[derive(Clone)]
pub struct PgBookmarkRepository {
    pool: PgPool,
}

impl PgBookmarkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookmarkRepository for PgBookmarkRepository {
    #[instrument(skip(self))]
    async fn toggle(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<ToggleOutcome> {
        let target = TargetRef::post(post_id);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        lock_target(&mut tx, target).await?;

        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id.into_inner())
            .bind(post_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();

        let delta: i64 = if removed > 0 {
            -1
        } else {
            let inserted = sqlx::query(
                r#"
                INSERT INTO bookmarks (user_id, post_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id.into_inner())
            .bind(post_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();

            if inserted == 0 {
                return Err(DomainError::conflict(format!(
                    "bookmark on {target} changed concurrently"
                )));
            }
            1
        };

        let (new_count,): (i64,) = sqlx::query_as(
            r#"
            UPDATE engagement_targets
            SET bookmark_count = GREATEST(bookmark_count + $3::BIGINT, 0)
            WHERE target_type = $1 AND target_id = $2
            RETURNING bookmark_count
            "#,
        )
        .bind(target.target_type.as_str())
        .bind(post_id.into_inner())
        .bind(delta)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(ToggleOutcome {
            active: delta > 0,
            new_count,
        })
    }

    #[instrument(skip(self))]
    async fn list_for_user(
        &self,
        user_id: Snowflake,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<BookmarkEdge>> {
        let rows = sqlx::query_as::<_, BookmarkModel>(
            r#"
            SELECT user_id, post_id, created_at
            FROM bookmarks
            WHERE user_id = $1
            ORDER BY created_at DESC, post_id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.into_inner())
        .bind(limit.clamp(1, 100))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(BookmarkEdge::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgBookmarkRepository>();
    }
}
