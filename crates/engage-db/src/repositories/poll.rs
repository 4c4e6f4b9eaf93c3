//! PostgreSQL implementation of PollRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{Poll, PollVote};
use engage_core::traits::{PollRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::mappers::{indices_from_db, indices_to_db, PollInsert};
use crate::models::{PollModel, PollVoteModel};

use super::error::{map_db_error, poll_not_found};

const POLL_COLUMNS: &str = "id, title, description, options, votes, allow_multiple, total_voters, \
     expires_at, is_active, campus_id, department_id, batch, created_by, created_at";

/// PostgreSQL implementation of PollRepository
#[derive(Clone)]
pub struct PgPollRepository {
    pool: PgPool,
}

impl PgPollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PollRepository for PgPollRepository {
    #[instrument(skip(self, poll), fields(poll_id = %poll.id))]
    async fn create(&self, poll: &Poll) -> RepoResult<()> {
        let row = PollInsert::new(poll);

        sqlx::query(
            r#"
            INSERT INTO polls (id, title, description, options, votes, allow_multiple,
                               expires_at, campus_id, department_id, batch, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.id)
        .bind(row.title)
        .bind(row.description)
        .bind(row.options)
        .bind(row.votes)
        .bind(row.allow_multiple)
        .bind(row.expires_at)
        .bind(row.campus_id)
        .bind(row.department_id)
        .bind(row.batch)
        .bind(row.created_by)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, id: Snowflake) -> RepoResult<Option<Poll>> {
        let model = sqlx::query_as::<_, PollModel>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        model.map(Poll::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_vote(
        &self,
        poll_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<PollVote>> {
        let model = sqlx::query_as::<_, PollVoteModel>(
            r#"
            SELECT poll_id, user_id, option_indices, voted_at
            FROM poll_votes
            WHERE poll_id = $1 AND user_id = $2
            "#,
        )
        .bind(poll_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        model.map(PollVote::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn replace_vote(
        &self,
        poll_id: Snowflake,
        user_id: Snowflake,
        indices: &[usize],
        now: DateTime<Utc>,
    ) -> RepoResult<Poll> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let model = sqlx::query_as::<_, PollModel>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE id = $1 FOR UPDATE"
        ))
        .bind(poll_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| poll_not_found(poll_id))?;

        let mut poll = Poll::try_from(model)?;
        poll.ensure_open(now)?;
        let selection = poll.validate_selection(indices)?;

        let previous: Option<(Vec<i32>,)> = sqlx::query_as(
            "SELECT option_indices FROM poll_votes WHERE poll_id = $1 AND user_id = $2",
        )
        .bind(poll_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;
        let previous = previous
            .map(|(raw,)| indices_from_db(&raw))
            .transpose()?;

        poll.replace_vote(previous.as_deref(), &selection);

        sqlx::query(
            r#"
            INSERT INTO poll_votes (poll_id, user_id, option_indices, voted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (poll_id, user_id) DO UPDATE
            SET option_indices = EXCLUDED.option_indices,
                voted_at = EXCLUDED.voted_at
            "#,
        )
        .bind(poll_id.into_inner())
        .bind(user_id.into_inner())
        .bind(indices_to_db(&selection)?)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query("UPDATE polls SET votes = $2, total_voters = $3 WHERE id = $1")
            .bind(poll_id.into_inner())
            .bind(&poll.votes)
            .bind(poll.total_voters)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(poll)
    }

    #[instrument(skip(self))]
    async fn close(&self, id: Snowflake) -> RepoResult<Poll> {
        let model = sqlx::query_as::<_, PollModel>(&format!(
            "UPDATE polls SET is_active = FALSE WHERE id = $1 RETURNING {POLL_COLUMNS}"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| poll_not_found(id))?;

        Poll::try_from(model)
    }
}
