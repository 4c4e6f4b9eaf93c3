//! Poll database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct PollModel {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub votes: Vec<i64>,
    pub allow_multiple: bool,
    pub total_voters: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    pub batch: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PollVoteModel {
    pub poll_id: i64,
    pub user_id: i64,
    pub option_indices: Vec<i32>,
    pub voted_at: DateTime<Utc>,
}
