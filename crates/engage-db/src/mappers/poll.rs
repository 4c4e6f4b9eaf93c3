//! Poll entity <-> model mapper

use engage_core::entities::{Poll, PollVote};
use engage_core::error::DomainError;
use engage_core::value_objects::Snowflake;

use super::{corrupt, scope_from_columns};
use crate::models::{PollModel, PollVoteModel};

impl TryFrom<PollModel> for Poll {
    type Error = DomainError;

    fn try_from(model: PollModel) -> Result<Self, Self::Error> {
        if model.options.len() != model.votes.len() {
            return Err(corrupt(
                "votes",
                format!("{} tallies for {} options", model.votes.len(), model.options.len()),
            ));
        }

        Ok(Poll {
            id: Snowflake::new(model.id),
            title: model.title,
            description: model.description,
            options: model.options,
            votes: model.votes,
            allow_multiple: model.allow_multiple,
            total_voters: model.total_voters,
            expires_at: model.expires_at,
            is_active: model.is_active,
            scope: scope_from_columns(model.campus_id, model.department_id, model.batch),
            created_by: Snowflake::new(model.created_by),
            created_at: model.created_at,
        })
    }
}

impl TryFrom<PollVoteModel> for PollVote {
    type Error = DomainError;

    fn try_from(model: PollVoteModel) -> Result<Self, Self::Error> {
        Ok(PollVote {
            poll_id: Snowflake::new(model.poll_id),
            user_id: Snowflake::new(model.user_id),
            option_indices: indices_from_db(&model.option_indices)?,
            voted_at: model.voted_at,
        })
    }
}

pub fn indices_from_db(raw: &[i32]) -> Result<Vec<usize>, DomainError> {
    raw.iter()
        .map(|&i| usize::try_from(i).map_err(|e| corrupt("option_indices", e)))
        .collect()
}

pub fn indices_to_db(indices: &[usize]) -> Result<Vec<i32>, DomainError> {
    indices
        .iter()
        .map(|&i| i32::try_from(i).map_err(|_| DomainError::validation("option index out of range")))
        .collect()
}

/// Values for inserting a new poll
pub struct PollInsert<'a> {
    pub id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub options: &'a [String],
    pub votes: &'a [i64],
    pub allow_multiple: bool,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub campus_id: Option<&'a str>,
    pub department_id: Option<&'a str>,
    pub batch: Option<&'a str>,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> PollInsert<'a> {
    pub fn new(poll: &'a Poll) -> Self {
        Self {
            id: poll.id.into_inner(),
            title: &poll.title,
            description: poll.description.as_deref(),
            options: &poll.options,
            votes: &poll.votes,
            allow_multiple: poll.allow_multiple,
            expires_at: poll.expires_at,
            campus_id: poll.scope.campus_id.as_deref(),
            department_id: poll.scope.department_id.as_deref(),
            batch: poll.scope.batch.as_deref(),
            created_by: poll.created_by.into_inner(),
            created_at: poll.created_at,
        }
    }
}
