//! Activity log service
//!
//! Append-only action log plus day/action/resource statistics. Appends
//! made on behalf of another action go through the side-effect runner and
//! never fail that action.

use chrono::{Duration, Utc};
use engage_core::entities::{
    ActivityAnalytics, ActivityFilter, ActivityLogEntry, ActivityStatistics, AnalyticsPeriod,
};
use engage_core::Snowflake;
use serde_json::Value;
use tracing::{debug, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Default statistics window when the caller gives no start date
const DEFAULT_STATS_DAYS: i64 = 30;

pub const MAX_ACTIVITY_PAGE: i64 = 1000;

/// An entry before it has an id and timestamp
#[derive(Debug, Clone, Default)]
pub struct ActivityDraft {
    pub user_id: Option<Snowflake>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ActivityDraft {
    pub fn new(user_id: Snowflake, action: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            action: Some(action.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    #[must_use]
    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Activity log service
pub struct ActivityService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ActivityService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Append one entry
    #[instrument(skip(self, draft), fields(action = ?draft.action))]
    pub async fn record(&self, draft: ActivityDraft) -> ServiceResult<ActivityLogEntry> {
        let entry = ActivityLogEntry {
            id: self.ctx.generate_id(),
            user_id: draft.user_id,
            action: draft.action,
            resource_type: draft.resource_type,
            resource_id: draft.resource_id,
            details: draft.details,
            ip_address: draft.ip_address,
            user_agent: draft.user_agent,
            created_at: Utc::now(),
        };
        self.ctx.activity_repo().append(&entry).await?;
        debug!(entry_id = %entry.id, "Activity recorded");
        Ok(entry)
    }

    /// Append without waiting; a failure is reported to the side-effect channel
    pub fn record_in_background(&self, draft: ActivityDraft) {
        let ctx = self.ctx.clone();
        self.ctx.side_effects().spawn("activity_log", async move {
            ActivityService::new(&ctx).record(draft).await.map(|_| ())
        });
    }

    /// Matching entries newest first, plus the total match count
    #[instrument(skip(self))]
    pub async fn list(&self, mut filter: ActivityFilter) -> ServiceResult<(Vec<ActivityLogEntry>, i64)> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(ServiceError::validation("startDate must not be after endDate"));
            }
        }
        filter.limit = filter.limit.clamp(1, MAX_ACTIVITY_PAGE);
        filter.offset = filter.offset.max(0);
        Ok(self.ctx.activity_repo().list(&filter).await?)
    }

    /// Bucketed counts over `[start, end]`; defaults to the last 30 days
    #[instrument(skip(self))]
    pub async fn statistics(
        &self,
        start: Option<chrono::DateTime<Utc>>,
        end: Option<chrono::DateTime<Utc>>,
    ) -> ServiceResult<ActivityStatistics> {
        let now = Utc::now();
        let end = end.unwrap_or(now);
        let start = start.unwrap_or(end - Duration::days(DEFAULT_STATS_DAYS));
        if start > end {
            return Err(ServiceError::validation("startDate must not be after endDate"));
        }
        let entries = self.ctx.activity_repo().in_range(start, end).await?;
        Ok(ActivityStatistics::from_entries(&entries, now))
    }

    /// Totals, unique users and top users over the period ending now
    #[instrument(skip(self))]
    pub async fn analytics(&self, period: AnalyticsPeriod) -> ServiceResult<ActivityAnalytics> {
        let now = Utc::now();
        let entries = self
            .ctx
            .activity_repo()
            .in_range(period.window_start(now), now)
            .await?;
        Ok(ActivityAnalytics::from_entries(period, &entries, now))
    }
}
