//! Engagement target, reaction counter and bookmark rows

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct TargetModel {
    pub target_type: String,
    pub target_id: i64,
    pub owner_id: Option<i64>,
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    pub batch: Option<String>,
    pub preview: Option<String>,
    pub like_count: i64,
    pub bookmark_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReactionCountModel {
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct BookmarkModel {
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}
