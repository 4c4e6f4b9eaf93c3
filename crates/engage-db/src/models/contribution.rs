//! Aggregate rows read from the contribution source tables

use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct PaperStatsRow {
    pub approved_uploads: i64,
    pub downloads: i64,
    pub helpful_marks: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewStatsRow {
    pub reviews: i64,
    pub helpful_marks: i64,
    pub detailed_reviews: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommunityStatsRow {
    pub posts: i64,
    pub likes: i64,
    pub comments: i64,
    pub popular_posts: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct HelpdeskStatsRow {
    pub tickets: i64,
    pub resolved_tickets: i64,
}
