//! Batch notification jobs and their status machine
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!    │            │
//!    │            └────────► Failed
//!    └────────────┴────────► Cancelled
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NotificationDraft, NotificationKind, RelatedType};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// The only edges the machine accepts
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown batch status: {s}")))
    }
}

/// Notification content sent to every recipient of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTemplate {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub related_id: Option<Snowflake>,
    #[serde(default)]
    pub related_type: Option<RelatedType>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NotificationTemplate {
    pub fn draft_for(&self, recipient_id: Snowflake, actor_id: Snowflake) -> NotificationDraft {
        NotificationDraft {
            recipient_id,
            actor_id: Some(actor_id),
            kind: self.kind,
            title: self.title.clone(),
            message: self.message.clone(),
            related_id: self.related_id,
            related_type: self.related_type,
            metadata: self.metadata.clone(),
        }
    }
}

/// Input for scheduling a batch
#[derive(Debug, Clone)]
pub struct BatchJobDraft {
    pub name: String,
    pub description: Option<String>,
    pub recipients: Vec<Snowflake>,
    pub template: NotificationTemplate,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_by: Snowflake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchNotificationJob {
    pub id: Snowflake,
    pub name: String,
    pub description: Option<String>,
    pub recipients: Vec<Snowflake>,
    pub template: NotificationTemplate,
    pub scheduled_for: DateTime<Utc>,
    pub status: BatchStatus,
    pub total_recipients: i64,
    pub processed_recipients: i64,
    /// Percent complete, 0-100
    pub progress: i32,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl BatchNotificationJob {
    pub fn schedule(
        id: Snowflake,
        draft: BatchJobDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("job name is required"));
        }
        if draft.template.title.trim().is_empty() || draft.template.message.trim().is_empty() {
            return Err(DomainError::validation(
                "notification template needs a title and a message",
            ));
        }

        let mut recipients = Vec::with_capacity(draft.recipients.len());
        for id in draft.recipients {
            if !recipients.contains(&id) {
                recipients.push(id);
            }
        }
        if recipients.is_empty() {
            return Err(DomainError::validation("recipients must not be empty"));
        }

        Ok(Self {
            id,
            name,
            description: draft.description,
            total_recipients: recipients.len() as i64,
            recipients,
            template: draft.template,
            scheduled_for: draft.scheduled_for.unwrap_or(now),
            status: BatchStatus::Pending,
            processed_recipients: 0,
            progress: 0,
            created_by: draft.created_by,
            created_at: now,
            started_at: None,
            completed_at: None,
            failed_at: None,
            error_message: None,
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == BatchStatus::Pending && self.scheduled_for <= now
    }

    /// Move to `next`, stamping the matching timestamp.
    ///
    /// `Failed` requires a non-empty `error_message`. Any edge outside the
    /// machine is rejected with `InvalidState` and leaves the job untouched.
    pub fn transition(
        &mut self,
        next: BatchStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_state(format!(
                "cannot move batch job from {} to {}",
                self.status, next
            )));
        }

        match next {
            BatchStatus::Processing => self.started_at = Some(now),
            BatchStatus::Completed => {
                self.completed_at = Some(now);
                self.processed_recipients = self.total_recipients;
                self.progress = 100;
            }
            BatchStatus::Failed => {
                let message = error_message
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .ok_or_else(|| DomainError::validation("a failed job needs an error message"))?;
                self.failed_at = Some(now);
                self.error_message = Some(message);
            }
            BatchStatus::Cancelled | BatchStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }

    /// Record how many recipients have been handled so far
    pub fn record_progress(&mut self, processed: i64) {
        self.processed_recipients = processed.clamp(0, self.total_recipients);
        self.progress = progress_percent(self.processed_recipients, self.total_recipients);
    }
}

pub fn progress_percent(processed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 100;
    }
    ((processed.clamp(0, total) * 100) / total) as i32
}

/// Filter for listing jobs
#[derive(Debug, Clone, Default)]
pub struct BatchJobQuery {
    pub status: Option<BatchStatus>,
    pub limit: i64,
    pub offset: i64,
}
