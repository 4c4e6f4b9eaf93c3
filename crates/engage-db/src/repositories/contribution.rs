//! PostgreSQL implementation of ContributionRepository
//!
//! Reads the portal's papers, reviews, community and helpdesk tables. Each
//! method is one aggregate query over one table.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use engage_core::entities::{CommunityStats, HelpdeskStats, PaperStats, ReviewStats};
use engage_core::traits::{ContributionRepository, LeaderboardScope, RepoResult};
use engage_core::value_objects::Snowflake;

use crate::models::{CommunityStatsRow, HelpdeskStatsRow, PaperStatsRow, ReviewStatsRow};

use super::error::map_db_error;

/// PostgreSQL implementation of ContributionRepository
#[derive(Clone)]
pub struct PgContributionRepository {
    pool: PgPool,
}

impl PgContributionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContributionRepository for PgContributionRepository {
    #[instrument(skip(self))]
    async fn contributors(&self, scope: &LeaderboardScope) -> RepoResult<Vec<Snowflake>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM profiles
            WHERE ($1::TEXT IS NULL OR campus_id = $1)
              AND ($2::TEXT IS NULL OR department_id = $2)
            ORDER BY id
            "#,
        )
        .bind(scope.campus_id.as_deref())
        .bind(scope.department_id.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(|(id,)| Snowflake::new(id)).collect())
    }

    #[instrument(skip(self))]
    async fn paper_stats(&self, user_id: Snowflake) -> RepoResult<PaperStats> {
        let row = sqlx::query_as::<_, PaperStatsRow>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'approved')                AS approved_uploads,
                   COALESCE(SUM(download_count), 0)::BIGINT                    AS downloads,
                   COALESCE(SUM(helpful_count), 0)::BIGINT                     AS helpful_marks
            FROM papers
            WHERE uploaded_by = $1
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(PaperStats {
            approved_uploads: row.approved_uploads,
            downloads: row.downloads,
            helpful_marks: row.helpful_marks,
        })
    }

    #[instrument(skip(self))]
    async fn review_stats(&self, user_id: Snowflake, detail_chars: i64) -> RepoResult<ReviewStats> {
        let row = sqlx::query_as::<_, ReviewStatsRow>(
            r#"
            SELECT COUNT(*)                                                    AS reviews,
                   COALESCE(SUM(helpful_count), 0)::BIGINT                     AS helpful_marks,
                   COUNT(*) FILTER (WHERE char_length(COALESCE(comment, '')) > $2) AS detailed_reviews
            FROM reviews
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.into_inner())
        .bind(detail_chars)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ReviewStats {
            reviews: row.reviews,
            helpful_marks: row.helpful_marks,
            detailed_reviews: row.detailed_reviews,
        })
    }

    #[instrument(skip(self))]
    async fn community_stats(
        &self,
        user_id: Snowflake,
        popular_likes: i64,
    ) -> RepoResult<CommunityStats> {
        let row = sqlx::query_as::<_, CommunityStatsRow>(
            r#"
            SELECT COUNT(*)                                         AS posts,
                   COALESCE(SUM(likes_count), 0)::BIGINT            AS likes,
                   COALESCE(SUM(comments_count), 0)::BIGINT         AS comments,
                   COUNT(*) FILTER (WHERE likes_count >= $2)        AS popular_posts
            FROM community_posts
            WHERE author_id = $1
            "#,
        )
        .bind(user_id.into_inner())
        .bind(popular_likes)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(CommunityStats {
            posts: row.posts,
            likes: row.likes,
            comments: row.comments,
            popular_posts: row.popular_posts,
        })
    }

    #[instrument(skip(self))]
    async fn helpdesk_stats(&self, user_id: Snowflake) -> RepoResult<HelpdeskStats> {
        let row = sqlx::query_as::<_, HelpdeskStatsRow>(
            r#"
            SELECT COUNT(*)                                    AS tickets,
                   COUNT(*) FILTER (WHERE status = 'resolved') AS resolved_tickets
            FROM helpdesk_tickets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(HelpdeskStats {
            tickets: row.tickets,
            resolved_tickets: row.resolved_tickets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgContributionRepository>();
    }
}
