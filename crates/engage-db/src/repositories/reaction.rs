//! PostgreSQL implementation of ReactionRepository
//!
//! A toggle locks the target row first, so concurrent toggles on the same
//! target serialize there and the edge change plus counter delta commit
//! together.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use engage_core::entities::{ReactionCounts, ReactionKind, TargetRef, ToggleOutcome};
use engage_core::error::DomainError;
use engage_core::traits::{ReactionRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::mappers::reaction_counts;
use crate::models::ReactionCountModel;

use super::error::{map_db_error, target_not_found};

/// PostgreSQL implementation of ReactionRepository
#[derive(Clone)]
pub struct PgReactionRepository {
    pool: PgPool,
}

impl PgReactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lock a live target row for the rest of the transaction
pub(crate) async fn lock_target(
    tx: &mut Transaction<'_, Postgres>,
    target: TargetRef,
) -> RepoResult<()> {
    let locked: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT target_id
        FROM engagement_targets
        WHERE target_type = $1 AND target_id = $2 AND deleted_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(target.target_type.as_str())
    .bind(target.target_id.into_inner())
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_db_error)?;

    locked.map(|_| ()).ok_or_else(|| target_not_found(target))
}

#[async_trait]
impl ReactionRepository for PgReactionRepository {
    #[instrument(skip(self))]
    async fn toggle(
        &self,
        user_id: Snowflake,
        target: TargetRef,
        kind: ReactionKind,
    ) -> RepoResult<ToggleOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        lock_target(&mut tx, target).await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM reactions
            WHERE user_id = $1 AND target_type = $2 AND target_id = $3 AND kind = $4
            "#,
        )
        .bind(user_id.into_inner())
        .bind(target.target_type.as_str())
        .bind(target.target_id.into_inner())
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        let delta: i64 = if removed > 0 {
            -1
        } else {
            let inserted = sqlx::query(
                r#"
                INSERT INTO reactions (user_id, target_type, target_id, kind)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id.into_inner())
            .bind(target.target_type.as_str())
            .bind(target.target_id.into_inner())
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();

            if inserted == 0 {
                return Err(DomainError::conflict(format!(
                    "reaction on {target} changed concurrently"
                )));
            }
            1
        };

        let (new_count,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO target_reaction_counts (target_type, target_id, kind, count)
            VALUES ($1, $2, $3, GREATEST($4::BIGINT, 0))
            ON CONFLICT (target_type, target_id, kind) DO UPDATE
            SET count = GREATEST(target_reaction_counts.count + $4::BIGINT, 0)
            RETURNING count
            "#,
        )
        .bind(target.target_type.as_str())
        .bind(target.target_id.into_inner())
        .bind(kind.as_str())
        .bind(delta)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if kind == ReactionKind::Like {
            sqlx::query(
                r#"
                UPDATE engagement_targets
                SET like_count = $3
                WHERE target_type = $1 AND target_id = $2
                "#,
            )
            .bind(target.target_type.as_str())
            .bind(target.target_id.into_inner())
            .bind(new_count)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(ToggleOutcome {
            active: delta > 0,
            new_count,
        })
    }

    #[instrument(skip(self))]
    async fn counts(&self, target: TargetRef) -> RepoResult<ReactionCounts> {
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

        reaction_counts(rows)
    }

    #[instrument(skip(self))]
    async fn kinds_for_user(
        &self,
        user_id: Snowflake,
        target: TargetRef,
    ) -> RepoResult<Vec<ReactionKind>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT kind
            FROM reactions
            WHERE user_id = $1 AND target_type = $2 AND target_id = $3
            ORDER BY created_at
            "#,
        )
        .bind(user_id.into_inner())
        .bind(target.target_type.as_str())
        .bind(target.target_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter()
            .map(|(kind,)| {
                kind.parse()
                    .map_err(|e| DomainError::DatabaseError(format!("invalid kind column: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgReactionRepository>();
    }
}
