//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` with camelCase keys.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use serde::Serialize;

use engage_core::entities::{
    BookmarkEdge, EngagementTarget, LeaderboardCategory, LeaderboardEntry, Notification, Poll,
    PollVote, ReactionCounts, ReactionKind, TargetRef, ToggleOutcome,
};
use engage_core::Snowflake;

// ============================================================================
// Common Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Offset-paginated list
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    /// `total` is the full match count when the store reports one
    pub fn new(data: Vec<T>, limit: i64, offset: i64, total: Option<i64>) -> Self {
        let has_more = match total {
            Some(total) => offset + (data.len() as i64) < total,
            None => data.len() as i64 == limit,
        };
        Self {
            data,
            pagination: PaginationMeta {
                limit,
                offset,
                total,
                has_more,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub limit: i64,
    pub offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    pub has_more: bool,
}

// ============================================================================
// Reactions & Bookmarks
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionToggleResponse {
    #[serde(flatten)]
    pub target: TargetRef,
    pub kind: ReactionKind,
    pub active: bool,
    /// Counter for `kind` after the toggle
    pub new_count: i64,
    pub like_count: i64,
    pub reaction_counts: ReactionCounts,
}

impl ReactionToggleResponse {
    pub fn new(
        target: TargetRef,
        kind: ReactionKind,
        outcome: ToggleOutcome,
        counts: ReactionCounts,
    ) -> Self {
        Self {
            target,
            kind,
            active: outcome.active,
            new_count: outcome.new_count,
            like_count: counts.get(&ReactionKind::Like).copied().unwrap_or(0),
            reaction_counts: counts,
        }
    }
}

/// Counts on a target plus the viewer's own reactions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummaryResponse {
    #[serde(flatten)]
    pub target: TargetRef,
    pub like_count: i64,
    pub reaction_counts: ReactionCounts,
    pub user_reactions: Vec<ReactionKind>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggleResponse {
    pub post_id: Snowflake,
    pub active: bool,
    pub bookmark_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResponse {
    pub post_id: Snowflake,
    pub created_at: DateTime<Utc>,
}

impl From<BookmarkEdge> for BookmarkResponse {
    fn from(edge: BookmarkEdge) -> Self {
        Self {
            post_id: edge.post_id,
            created_at: edge.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResponse {
    #[serde(flatten)]
    pub target: EngagementTarget,
}

// ============================================================================
// Polls
// ============================================================================

/// A poll with its derived totals and the viewer's current selection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    #[serde(flatten)]
    pub poll: Poll,
    pub total_votes: i64,
    pub user_vote: Option<Vec<usize>>,
}

impl PollResponse {
    pub fn new(poll: Poll, vote: Option<PollVote>) -> Self {
        Self {
            total_votes: poll.total_votes(),
            user_vote: vote.map(|v| v.option_indices),
            poll,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Notifications created by one engagement event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub created: Vec<Notification>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub processed: usize,
}

// ============================================================================
// Leaderboard
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub category: LeaderboardCategory,
    pub entries: Vec<LeaderboardEntry>,
    /// Some category source failed for some user and was counted as zero
    pub partial: bool,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Per-dependency status: `healthy`, `unhealthy` or `disabled`
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub store: String,
    pub relay: String,
}

impl ReadinessResponse {
    /// `None` marks a dependency this instance does not use
    pub fn ready(store: Option<bool>, relay: Option<bool>) -> Self {
        let all_healthy = store.unwrap_or(true) && relay.unwrap_or(true);
        Self {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                store: check_label(store),
                relay: check_label(relay),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

fn check_label(check: Option<bool>) -> String {
    match check {
        Some(true) => "healthy",
        Some(false) => "unhealthy",
        None => "disabled",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_response_shape() {
        let mut counts = ReactionCounts::new();
        counts.insert(ReactionKind::Like, 3);
        counts.insert(ReactionKind::Love, 1);
        let response = ReactionToggleResponse::new(
            TargetRef::post(Snowflake::new(9)),
            ReactionKind::Love,
            ToggleOutcome {
                active: true,
                new_count: 1,
            },
            counts,
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["targetType"], "post");
        assert_eq!(json["targetId"], "9");
        assert_eq!(json["newCount"], 1);
        assert_eq!(json["likeCount"], 3);
        assert_eq!(json["reactionCounts"]["love"], 1);
    }

    #[test]
    fn test_pagination_has_more() {
        let page = PaginatedResponse::new(vec![1, 2], 2, 0, Some(5));
        assert!(page.pagination.has_more);
        let page = PaginatedResponse::new(vec![1], 2, 4, Some(5));
        assert!(!page.pagination.has_more);
        let page = PaginatedResponse::new(vec![1, 2], 2, 0, None);
        assert!(page.pagination.has_more);
    }

    #[test]
    fn test_readiness_response() {
        let ready = ReadinessResponse::ready(Some(true), None);
        assert!(ready.is_ready());
        assert_eq!(ready.checks.relay, "disabled");

        let not_ready = ReadinessResponse::ready(Some(true), Some(false));
        assert_eq!(not_ready.status, "not_ready");
        assert_eq!(not_ready.checks.relay, "unhealthy");
    }
}
