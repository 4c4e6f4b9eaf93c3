//! Audience scope of a record and the subscriber-side filter over it

use serde::{Deserialize, Serialize};

use super::Snowflake;

/// Where a record lives in the campus hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
}

impl Scope {
    pub fn campus(campus_id: impl Into<String>) -> Self {
        Self {
            campus_id: Some(campus_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    #[must_use]
    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }
}

/// Conjunction over optional scope dimensions.
///
/// A `None` dimension matches everything. A set dimension only matches
/// records carrying the same value; records without that dimension never
/// match it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeFilter {
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    pub batch: Option<String>,
    /// Authenticated viewer; personal events (notifications) only reach
    /// the subscriber whose viewer is the event's audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<Snowflake>,
}

impl ScopeFilter {
    /// Batch value clients send to mean "every batch"
    pub const ALL_BATCHES: &'static str = "__all__";

    pub fn new(
        campus_id: Option<String>,
        department_id: Option<String>,
        batch: Option<String>,
    ) -> Self {
        Self {
            campus_id: normalize(campus_id),
            department_id: normalize(department_id),
            batch: normalize(batch).filter(|b| b != Self::ALL_BATCHES),
            viewer_id: None,
        }
    }

    #[must_use]
    pub fn for_viewer(mut self, viewer_id: Snowflake) -> Self {
        self.viewer_id = Some(viewer_id);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.campus_id.is_none() && self.department_id.is_none() && self.batch.is_none()
    }

    pub fn matches(&self, scope: &Scope) -> bool {
        dimension_matches(self.campus_id.as_deref(), scope.campus_id.as_deref())
            && dimension_matches(self.department_id.as_deref(), scope.department_id.as_deref())
            && dimension_matches(self.batch.as_deref(), scope.batch.as_deref())
    }

    /// Whether a personal event addressed to `audience` may reach this subscriber
    pub fn admits_audience(&self, audience: Option<Snowflake>) -> bool {
        match audience {
            None => true,
            Some(target) => self.viewer_id == Some(target),
        }
    }
}

fn dimension_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual == Some(wanted),
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
