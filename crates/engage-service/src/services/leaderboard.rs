//! Scoring & leaderboard aggregator
//!
//! Scores are recomputed per request from four independent contribution
//! sources. A failing source for one user zeroes that category for that
//! user and flags the result partial; only a failure to list the users at
//! all fails the call.

use chrono::Utc;
use engage_core::entities::{rank_users, Breakdown, LeaderboardCategory, ScoredUser};
use engage_core::{DomainError, LeaderboardScope, RepoResult, Snowflake};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::dto::LeaderboardResponse;

use super::context::ServiceContext;
use super::error::ServiceResult;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Leaderboard service
pub struct LeaderboardService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LeaderboardService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self))]
    pub async fn compute(
        &self,
        scope: LeaderboardScope,
        category: LeaderboardCategory,
        limit: Option<usize>,
    ) -> ServiceResult<LeaderboardResponse> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT);

        let users = self
            .ctx
            .contribution_repo()
            .contributors(&scope)
            .await
            .map_err(|err| match err {
                DomainError::Unavailable(_) => err,
                other => DomainError::Unavailable(format!("contributor listing failed: {other}")),
            })?;

        let scored = join_all(users.into_iter().map(|user_id| self.score(user_id))).await;
        let partial = scored.iter().any(|u| u.partial);
        let entries = rank_users(scored, category, limit);

        info!(
            category = %category,
            entries = entries.len(),
            partial,
            "Leaderboard computed"
        );

        Ok(LeaderboardResponse {
            category,
            entries,
            partial,
            generated_at: Utc::now(),
        })
    }

    /// All four categories for one user; failed sources count as zero
    async fn score(&self, user_id: Snowflake) -> ScoredUser {
        let weights = self.ctx.scoring();
        let repo = self.ctx.contribution_repo();

        let (papers, reviews, community, helpdesk) = tokio::join!(
            async { repo.paper_stats(user_id).await.map(|s| s.points(weights)) },
            async {
                repo.review_stats(user_id, weights.review_detail_chars)
                    .await
                    .map(|s| s.points(weights))
            },
            async {
                repo.community_stats(user_id, weights.popular_post_likes)
                    .await
                    .map(|s| s.points(weights))
            },
            async { repo.helpdesk_stats(user_id).await.map(|s| s.points(weights)) },
        );

        let mut breakdown = Breakdown::default();
        let mut partial = false;
        let results: [(LeaderboardCategory, RepoResult<i64>); 4] = [
            (LeaderboardCategory::Papers, papers),
            (LeaderboardCategory::Reviews, reviews),
            (LeaderboardCategory::Community, community),
            (LeaderboardCategory::Helpdesk, helpdesk),
        ];
        for (category, result) in results {
            match result {
                Ok(points) => breakdown.set(category, points),
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        category = %category,
                        error = %err,
                        "Contribution source failed, counted as zero"
                    );
                    partial = true;
                }
            }
        }

        ScoredUser {
            user_id,
            breakdown,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::Badge;
    use engage_db::{ContributorRecord, MemoryStore, PaperRecord, PostRecord, ReviewRecord, TicketRecord};

    fn context() -> (ServiceContext, MemoryStore) {
        let store = MemoryStore::new();
        let ctx = ServiceContext::builder().memory(&store).build().unwrap();
        (ctx, store)
    }

    fn active_member(campus: &str) -> ContributorRecord {
        ContributorRecord {
            campus_id: Some(campus.to_string()),
            department_id: None,
            // 50 + 2*3 + 10*1 = 66
            papers: vec![PaperRecord {
                approved: true,
                downloads: 3,
                helpful: 1,
            }],
            // 25 + 5*2 + 15 = 50
            reviews: vec![ReviewRecord {
                comment: "x".repeat(250),
                helpful: 2,
            }],
            // 15 + 3*10 + 5*1 + 20 = 70
            posts: vec![PostRecord {
                likes: 10,
                comments: 1,
            }],
            // 10 + 30 = 40
            tickets: vec![TicketRecord { resolved: true }],
        }
    }

    #[tokio::test]
    async fn test_overall_points_and_tie_break() {
        let (ctx, store) = context();
        store.seed_contributor(Snowflake::new(7), active_member("north"));
        store.seed_contributor(Snowflake::new(3), active_member("north"));
        store.seed_contributor(
            Snowflake::new(5),
            ContributorRecord {
                campus_id: Some("north".into()),
                tickets: vec![TicketRecord { resolved: false }],
                ..ContributorRecord::default()
            },
        );

        let board = LeaderboardService::new(&ctx)
            .compute(LeaderboardScope::default(), LeaderboardCategory::Overall, None)
            .await
            .unwrap();

        assert!(!board.partial);
        let ids: Vec<i64> = board.entries.iter().map(|e| e.user_id.into_inner()).collect();
        assert_eq!(ids, vec![3, 7, 5]);
        assert_eq!(board.entries[0].total_points, 226);
        assert_eq!(board.entries[0].badge, Badge::Champion);
        assert_eq!(board.entries[2].total_points, 10);
    }

    #[tokio::test]
    async fn test_failed_review_source_degrades_one_user() {
        let (ctx, store) = context();
        store.seed_contributor(Snowflake::new(1), active_member("north"));
        store.seed_contributor(Snowflake::new(2), active_member("north"));
        store.fail_source(LeaderboardCategory::Reviews, Some(Snowflake::new(1)));

        let board = LeaderboardService::new(&ctx)
            .compute(LeaderboardScope::default(), LeaderboardCategory::Overall, None)
            .await
            .unwrap();

        assert!(board.partial);
        let degraded = board
            .entries
            .iter()
            .find(|e| e.user_id == Snowflake::new(1))
            .unwrap();
        assert!(degraded.partial);
        assert_eq!(degraded.breakdown.reviews, 0);
        assert_eq!(degraded.breakdown.papers, 66);
        assert_eq!(degraded.breakdown.community, 70);
        assert_eq!(degraded.breakdown.helpdesk, 40);
        // the healthy user now outranks the degraded one
        assert_eq!(board.entries[0].user_id, Snowflake::new(2));
    }

    #[tokio::test]
    async fn test_category_filter_scope_and_limit() {
        let (ctx, store) = context();
        store.seed_contributor(Snowflake::new(1), active_member("north"));
        store.seed_contributor(Snowflake::new(2), active_member("south"));
        store.seed_contributor(
            Snowflake::new(3),
            ContributorRecord {
                campus_id: Some("north".into()),
                tickets: vec![TicketRecord { resolved: true }],
                ..ContributorRecord::default()
            },
        );

        let service = LeaderboardService::new(&ctx);
        let north = LeaderboardScope {
            campus_id: Some("north".into()),
            department_id: None,
        };

        let papers = service
            .compute(north.clone(), LeaderboardCategory::Papers, None)
            .await
            .unwrap();
        assert_eq!(papers.entries.len(), 1);
        assert_eq!(papers.entries[0].points, 66);

        let top = service
            .compute(north, LeaderboardCategory::Helpdesk, Some(1))
            .await
            .unwrap();
        assert_eq!(top.entries.len(), 1);
        assert_eq!(top.entries[0].user_id, Snowflake::new(1));
    }

    #[tokio::test]
    async fn test_contributor_listing_failure_is_unavailable() {
        let (ctx, store) = context();
        store.fail_contributors();
        let err = LeaderboardService::new(&ctx)
            .compute(LeaderboardScope::default(), LeaderboardCategory::Overall, None)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.status_code(), 503);
    }
}
