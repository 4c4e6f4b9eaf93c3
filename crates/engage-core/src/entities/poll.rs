//! Polls and poll votes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Scope, Snowflake};

/// Everything needed to open a new poll
#[derive(Debug, Clone)]
pub struct PollDraft {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub allow_multiple: bool,
    pub expires_in_days: Option<i64>,
    pub scope: Scope,
    pub created_by: Snowflake,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: Snowflake,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    /// Tally per option; always the same length as `options`
    pub votes: Vec<i64>,
    pub allow_multiple: bool,
    /// Distinct users with a current vote
    pub total_voters: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub scope: Scope,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub const MIN_OPTIONS: usize = 2;
    pub const MAX_OPTIONS: usize = 10;

    /// Validate a draft and build a poll with a zeroed tally
    pub fn open(id: Snowflake, draft: PollDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("poll question is required"));
        }

        let options: Vec<String> = draft.options.iter().map(|o| o.trim().to_string()).collect();
        if options.len() < Self::MIN_OPTIONS {
            return Err(DomainError::validation("at least 2 options are required"));
        }
        if options.len() > Self::MAX_OPTIONS {
            return Err(DomainError::validation(format!(
                "at most {} options are allowed",
                Self::MAX_OPTIONS
            )));
        }
        if let Some(pos) = options.iter().position(String::is_empty) {
            return Err(DomainError::validation(format!("option {pos} is empty")));
        }

        let expires_at = match draft.expires_in_days {
            Some(days) if days <= 0 => {
                return Err(DomainError::validation("expiresInDays must be positive"))
            }
            Some(days) => Some(now + Duration::days(days)),
            None => None,
        };

        Ok(Self {
            id,
            title,
            description: draft
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            votes: vec![0; options.len()],
            options,
            allow_multiple: draft.allow_multiple,
            total_voters: 0,
            expires_at,
            is_active: true,
            scope: draft.scope,
            created_by: draft.created_by,
            created_at: now,
        })
    }

    /// `sum(votes)` for single-choice polls, distinct voters otherwise
    pub fn total_votes(&self) -> i64 {
        if self.allow_multiple {
            self.total_voters
        } else {
            self.votes.iter().sum()
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    pub fn ensure_open(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::invalid_state("poll is not active"));
        }
        if self.is_expired_at(now) {
            return Err(DomainError::invalid_state("poll has expired"));
        }
        Ok(())
    }

    /// Check a selection against this poll's option set and choice policy.
    /// Returns the selection sorted ascending.
    pub fn validate_selection(&self, indices: &[usize]) -> Result<Vec<usize>, DomainError> {
        if indices.is_empty() {
            return Err(DomainError::validation("select at least one option"));
        }
        if !self.allow_multiple && indices.len() != 1 {
            return Err(DomainError::validation(
                "this poll allows exactly one option",
            ));
        }
        if let Some(bad) = indices.iter().find(|&&i| i >= self.options.len()) {
            return Err(DomainError::validation(format!(
                "option index {bad} is out of range"
            )));
        }

        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != indices.len() {
            return Err(DomainError::validation("duplicate option in selection"));
        }
        Ok(sorted)
    }

    /// Swap a voter's previous selection for a new one on the tally.
    ///
    /// Both selections must already be validated against this poll.
    pub fn replace_vote(&mut self, previous: Option<&[usize]>, next: &[usize]) {
        match previous {
            Some(prev) => {
                for &i in prev {
                    if let Some(slot) = self.votes.get_mut(i) {
                        *slot = (*slot - 1).max(0);
                    }
                }
            }
            None => self.total_voters += 1,
        }
        for &i in next {
            if let Some(slot) = self.votes.get_mut(i) {
                *slot += 1;
            }
        }
    }
}

/// A user's current selection on a poll; one row per `(poll, user)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollVote {
    pub poll_id: Snowflake,
    pub user_id: Snowflake,
    pub option_indices: Vec<usize>,
    pub voted_at: DateTime<Utc>,
}
