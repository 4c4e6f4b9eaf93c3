//! Seedable contribution sources

use async_trait::async_trait;

use engage_core::entities::{
    CommunityStats, HelpdeskStats, LeaderboardCategory, PaperStats, ReviewStats,
};
use engage_core::error::DomainError;
use engage_core::traits::{ContributionRepository, LeaderboardScope, RepoResult};
use engage_core::value_objects::Snowflake;

use super::MemoryStore;

#[derive(Debug, Clone, Default)]
pub struct PaperRecord {
    pub approved: bool,
    pub downloads: i64,
    pub helpful: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewRecord {
    pub comment: String,
    pub helpful: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PostRecord {
    pub likes: i64,
    pub comments: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TicketRecord {
    pub resolved: bool,
}

/// One user's profile scope and raw activity
#[derive(Debug, Clone, Default)]
pub struct ContributorRecord {
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    pub papers: Vec<PaperRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub posts: Vec<PostRecord>,
    pub tickets: Vec<TicketRecord>,
}

impl MemoryStore {
    fn source(
        &self,
        category: LeaderboardCategory,
        user_id: Snowflake,
    ) -> RepoResult<ContributorRecord> {
        self.available()?;
        let state = self.state.lock();
        if state.failing_sources.contains(&(category, None))
            || state.failing_sources.contains(&(category, Some(user_id)))
        {
            return Err(DomainError::Unavailable(format!("{category} source offline")));
        }
        Ok(state.contributors.get(&user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ContributionRepository for MemoryStore {
    async fn contributors(&self, scope: &LeaderboardScope) -> RepoResult<Vec<Snowflake>> {
        self.available()?;
        let state = self.state.lock();
        if state.contributors_down {
            return Err(DomainError::Unavailable("profiles source offline".into()));
        }
        let mut ids: Vec<Snowflake> = state
            .contributors
            .iter()
            .filter(|(_, c)| {
                scope
                    .campus_id
                    .as_ref()
                    .is_none_or(|campus| c.campus_id.as_ref() == Some(campus))
                    && scope
                        .department_id
                        .as_ref()
                        .is_none_or(|dept| c.department_id.as_ref() == Some(dept))
            })
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn paper_stats(&self, user_id: Snowflake) -> RepoResult<PaperStats> {
        let record = self.source(LeaderboardCategory::Papers, user_id)?;
        Ok(PaperStats {
            approved_uploads: record.papers.iter().filter(|p| p.approved).count() as i64,
            downloads: record.papers.iter().map(|p| p.downloads).sum(),
            helpful_marks: record.papers.iter().map(|p| p.helpful).sum(),
        })
    }

    async fn review_stats(&self, user_id: Snowflake, detail_chars: i64) -> RepoResult<ReviewStats> {
        let record = self.source(LeaderboardCategory::Reviews, user_id)?;
        Ok(ReviewStats {
            reviews: record.reviews.len() as i64,
            helpful_marks: record.reviews.iter().map(|r| r.helpful).sum(),
            detailed_reviews: record
                .reviews
                .iter()
                .filter(|r| r.comment.chars().count() as i64 > detail_chars)
                .count() as i64,
        })
    }

    async fn community_stats(
        &self,
        user_id: Snowflake,
        popular_likes: i64,
    ) -> RepoResult<CommunityStats> {
        let record = self.source(LeaderboardCategory::Community, user_id)?;
        Ok(CommunityStats {
            posts: record.posts.len() as i64,
            likes: record.posts.iter().map(|p| p.likes).sum(),
            comments: record.posts.iter().map(|p| p.comments).sum(),
            popular_posts: record.posts.iter().filter(|p| p.likes >= popular_likes).count() as i64,
        })
    }

    async fn helpdesk_stats(&self, user_id: Snowflake) -> RepoResult<HelpdeskStats> {
        let record = self.source(LeaderboardCategory::Helpdesk, user_id)?;
        Ok(HelpdeskStats {
            tickets: record.tickets.len() as i64,
            resolved_tickets: record.tickets.iter().filter(|t| t.resolved).count() as i64,
        })
    }
}
