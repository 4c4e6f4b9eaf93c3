//! Test fixtures and data generators
//!
//! Request bodies and the subset of response shapes the tests inspect.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Counter for unique ids across tests in one binary
static COUNTER: AtomicI64 = AtomicI64::new(1_000);

/// Get a unique id for test data
pub fn unique_id() -> i64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Register/refresh target body
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTargetRequest {
    pub owner_id: Option<String>,
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    pub batch: Option<String>,
    pub preview: Option<String>,
}

impl RegisterTargetRequest {
    pub fn owned_by(owner: i64, campus: &str) -> Self {
        Self {
            owner_id: Some(owner.to_string()),
            campus_id: Some(campus.to_string()),
            preview: Some("Library hours extended during finals".to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    pub target_type: String,
    pub target_id: String,
    pub kind: Option<String>,
}

impl ToggleReactionRequest {
    pub fn like_post(post_id: i64) -> Self {
        Self {
            target_type: "post".to_string(),
            target_id: post_id.to_string(),
            kind: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionToggleResponse {
    pub active: bool,
    pub new_count: i64,
    pub like_count: i64,
    pub reaction_counts: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: String,
    pub options: Vec<String>,
    pub allow_multiple: bool,
    pub expires_in_days: Option<i64>,
    pub campus_id: Option<String>,
}

impl CreatePollRequest {
    pub fn single(title: &str, options: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
            allow_multiple: false,
            expires_in_days: Some(7),
            campus_id: Some("north".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub votes: Vec<i64>,
    pub total_voters: i64,
    pub total_votes: i64,
    pub is_active: bool,
    pub user_vote: Option<Vec<usize>>,
}

pub fn vote(indices: &[usize]) -> Value {
    json!({ "optionIndices": indices })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    pub recipient_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxResponse {
    pub notifications: Vec<NotificationView>,
    pub unread_count: i64,
}

/// Batch job body announcing an event to `recipients`
pub fn batch_job(recipients: &[i64]) -> Value {
    json!({
        "name": "Orientation reminder",
        "recipients": recipients.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "template": {
            "type": "event_reminder",
            "title": "Orientation",
            "message": "Orientation starts Monday at 9am",
            "metadata": {}
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobView {
    pub id: String,
    pub status: String,
    pub total_recipients: i64,
    pub processed_recipients: i64,
    pub progress: i32,
}
