//! Activity log entries and the analytics computed over them

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Bucket for entries without a usable action or resource type
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Actions the engine itself records
pub mod actions {
    pub const REACT: &str = "react";
    pub const UNREACT: &str = "unreact";
    pub const BOOKMARK: &str = "bookmark";
    pub const UNBOOKMARK: &str = "unbookmark";
    pub const CREATE_POLL: &str = "create_poll";
    pub const VOTE: &str = "vote";
    pub const CLOSE_POLL: &str = "close_poll";
    pub const SCHEDULE_BATCH: &str = "schedule_batch_notification";
}

/// Append-only record of something a user did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: Snowflake,
    pub user_id: Option<Snowflake>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn action_bucket(&self) -> &str {
        bucket(self.action.as_deref())
    }

    pub fn resource_bucket(&self) -> &str {
        bucket(self.resource_type.as_deref())
    }
}

fn bucket(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => UNKNOWN_BUCKET,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub user_id: Option<Snowflake>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl ActivityFilter {
    pub const DEFAULT_LIMIT: i64 = 100;

    /// In-memory equivalent of the store's WHERE clause
    pub fn accepts(&self, entry: &ActivityLogEntry) -> bool {
        self.action
            .as_deref()
            .is_none_or(|a| entry.action.as_deref() == Some(a))
            && self
                .resource_type
                .as_deref()
                .is_none_or(|r| entry.resource_type.as_deref() == Some(r))
            && self.user_id.is_none_or(|u| entry.user_id == Some(u))
            && self.start.is_none_or(|s| entry.created_at >= s)
            && self.end.is_none_or(|e| entry.created_at <= e)
    }
}

/// Bucketed counts over a window of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStatistics {
    pub total: i64,
    pub total_today: i64,
    pub by_action: BTreeMap<String, i64>,
    pub by_resource: BTreeMap<String, i64>,
    /// Keyed by UTC calendar day, `YYYY-MM-DD`
    pub timeline: BTreeMap<String, i64>,
}

impl ActivityStatistics {
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a ActivityLogEntry>,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let mut stats = Self::default();
        for entry in entries {
            stats.total += 1;
            if entry.created_at.date_naive() == today {
                stats.total_today += 1;
            }
            *stats
                .by_action
                .entry(entry.action_bucket().to_string())
                .or_default() += 1;
            *stats
                .by_resource
                .entry(entry.resource_bucket().to_string())
                .or_default() += 1;
            *stats.timeline.entry(day_key(entry.created_at)).or_default() += 1;
        }
        stats
    }
}

pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl AnalyticsPeriod {
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Day => now - Duration::days(1),
            Self::Week => now - Duration::weeks(1),
            Self::Month => now - Duration::days(30),
            Self::Year => now - Duration::days(365),
        }
    }
}

impl FromStr for AnalyticsPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(DomainError::validation(format!(
                "unknown analytics period: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityCount {
    pub user_id: Snowflake,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAnalytics {
    pub period: AnalyticsPeriod,
    pub total_activities: i64,
    pub unique_users: i64,
    pub top_users: Vec<UserActivityCount>,
    pub by_action: BTreeMap<String, i64>,
    pub by_resource: BTreeMap<String, i64>,
    pub timeline: BTreeMap<String, i64>,
}

impl ActivityAnalytics {
    pub const TOP_USERS: usize = 10;

    pub fn from_entries(
        period: AnalyticsPeriod,
        entries: &[ActivityLogEntry],
        now: DateTime<Utc>,
    ) -> Self {
        let stats = ActivityStatistics::from_entries(entries, now);

        let mut per_user: HashMap<Snowflake, i64> = HashMap::new();
        for user in entries.iter().filter_map(|e| e.user_id) {
            *per_user.entry(user).or_default() += 1;
        }
        let unique: HashSet<_> = per_user.keys().collect();

        let mut top_users: Vec<UserActivityCount> = per_user
            .iter()
            .map(|(&user_id, &count)| UserActivityCount { user_id, count })
            .collect();
        top_users.sort_by(|a, b| b.count.cmp(&a.count).then(a.user_id.cmp(&b.user_id)));
        top_users.truncate(Self::TOP_USERS);

        Self {
            period,
            total_activities: stats.total,
            unique_users: unique.len() as i64,
            top_users,
            by_action: stats.by_action,
            by_resource: stats.by_resource,
            timeline: stats.timeline,
        }
    }
}
