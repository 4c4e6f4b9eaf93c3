//! Request DTOs for API endpoints
//!
//! Bodies implement `Deserialize` and `Validate`; query strings only
//! `Deserialize`. Closed vocabularies (reaction kinds, statuses, periods)
//! arrive as strings and are parsed with the domain's `FromStr`, so an
//! unknown value is a `VALIDATION_ERROR` rather than a decode failure.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use engage_core::entities::{
    ActivityFilter, AnalyticsPeriod, BatchJobDraft, BatchStatus, EngagementTarget,
    LeaderboardCategory, NotificationTemplate, PollDraft, ReactionKind, TargetRef, TargetType,
};
use engage_core::traits::LeaderboardScope;
use engage_core::{DomainError, Scope, Snowflake};

// ============================================================================
// Targets
// ============================================================================

/// Register or refresh an engagement target
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTargetRequest {
    pub owner_id: Option<Snowflake>,

    pub campus_id: Option<String>,

    pub department_id: Option<String>,

    pub batch: Option<String>,

    #[validate(length(max = 500, message = "Preview must be at most 500 characters"))]
    pub preview: Option<String>,
}

impl RegisterTargetRequest {
    pub fn into_target(self, target: TargetRef) -> EngagementTarget {
        let mut entity = EngagementTarget::new(
            target,
            self.owner_id,
            Scope {
                campus_id: self.campus_id,
                department_id: self.department_id,
                batch: self.batch,
            },
        );
        entity.preview = self.preview.filter(|p| !p.trim().is_empty());
        entity
    }
}

/// Parse a `(targetType, targetId)` path pair
pub fn parse_target(target_type: &str, target_id: Snowflake) -> Result<TargetRef, DomainError> {
    Ok(TargetRef::new(target_type.parse::<TargetType>()?, target_id))
}

// ============================================================================
// Reactions & Bookmarks
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    #[validate(length(min = 1, message = "targetType is required"))]
    pub target_type: String,

    pub target_id: Snowflake,

    /// Defaults to `like`
    #[serde(default)]
    pub kind: Option<String>,
}

impl ToggleReactionRequest {
    pub fn target(&self) -> Result<TargetRef, DomainError> {
        parse_target(&self.target_type, self.target_id)
    }

    pub fn kind(&self) -> Result<ReactionKind, DomainError> {
        self.kind
            .as_deref()
            .map_or(Ok(ReactionKind::Like), str::parse)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBookmarkRequest {
    pub post_id: Snowflake,
}

/// Offset pagination for list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// `(limit, offset)` with the limit clamped to `1..=max`
    pub fn resolve(self, default: i64, max: i64) -> (i64, i64) {
        (
            self.limit.unwrap_or(default).clamp(1, max),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

// ============================================================================
// Polls
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 300, message = "Question must be 1-300 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 10, message = "A poll needs 2-10 options"))]
    pub options: Vec<String>,

    #[serde(default)]
    pub allow_multiple: bool,

    #[validate(range(min = 1, max = 365, message = "expiresInDays must be 1-365"))]
    pub expires_in_days: Option<i64>,

    pub campus_id: Option<String>,

    pub department_id: Option<String>,

    pub batch: Option<String>,
}

impl CreatePollRequest {
    pub fn into_draft(self, created_by: Snowflake) -> PollDraft {
        PollDraft {
            title: self.title,
            description: self.description,
            options: self.options,
            allow_multiple: self.allow_multiple,
            expires_in_days: self.expires_in_days,
            scope: Scope {
                campus_id: self.campus_id,
                department_id: self.department_id,
                batch: self.batch,
            },
            created_by,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[validate(length(min = 1, message = "Select at least one option"))]
    pub option_indices: Vec<usize>,
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

/// Mark specific notifications, or all of them, as read
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_ids: Option<Vec<Snowflake>>,
    #[serde(default)]
    pub mark_all: bool,
}

impl MarkReadRequest {
    /// `None` means every unread notification
    pub fn selection(self) -> Result<Option<Vec<Snowflake>>, DomainError> {
        if self.mark_all {
            return Ok(None);
        }
        match self.notification_ids {
            Some(ids) if !ids.is_empty() => Ok(Some(ids)),
            _ => Err(DomainError::validation(
                "provide notificationIds or set markAll",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchJobRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 10000, message = "A batch needs 1-10000 recipients"))]
    pub recipients: Vec<Snowflake>,

    pub template: NotificationTemplate,

    pub scheduled_for: Option<DateTime<Utc>>,
}

impl CreateBatchJobRequest {
    pub fn into_draft(self, created_by: Snowflake) -> BatchJobDraft {
        BatchJobDraft {
            name: self.name,
            description: self.description,
            recipients: self.recipients,
            template: self.template,
            scheduled_for: self.scheduled_for,
            created_by,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BatchListParams {
    pub fn status(&self) -> Result<Option<BatchStatus>, DomainError> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,

    #[validate(length(max = 2000, message = "errorMessage must be at most 2000 characters"))]
    pub error_message: Option<String>,
}

// ============================================================================
// Leaderboard
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    pub category: Option<String>,
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    pub limit: Option<i64>,
}

impl LeaderboardParams {
    pub fn category(&self) -> Result<LeaderboardCategory, DomainError> {
        self.category
            .as_deref()
            .map_or(Ok(LeaderboardCategory::Overall), str::parse)
    }

    pub fn scope(&self) -> LeaderboardScope {
        LeaderboardScope {
            campus_id: self.campus_id.clone().filter(|c| !c.trim().is_empty()),
            department_id: self.department_id.clone().filter(|d| !d.trim().is_empty()),
        }
    }
}

// ============================================================================
// Activity Log
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityRequest {
    #[validate(length(min = 1, max = 100, message = "Action must be 1-100 characters"))]
    pub action: String,

    #[validate(length(max = 100, message = "resourceType must be at most 100 characters"))]
    pub resource_type: Option<String>,

    pub resource_id: Option<String>,

    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListParams {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub user_id: Option<Snowflake>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ActivityListParams> for ActivityFilter {
    fn from(params: ActivityListParams) -> Self {
        Self {
            action: params.action,
            resource_type: params.resource_type,
            user_id: params.user_id,
            start: params.start_date,
            end: params.end_date,
            limit: params.limit.unwrap_or(ActivityFilter::DEFAULT_LIMIT),
            offset: params.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsParams {
    pub period: Option<String>,
}

impl AnalyticsParams {
    pub fn period(&self) -> Result<AnalyticsPeriod, DomainError> {
        self.period
            .as_deref()
            .map_or(Ok(AnalyticsPeriod::Week), str::parse)
    }
}
