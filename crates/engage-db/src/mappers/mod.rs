//! Entity to model mappers
//!
//! - `TryFrom<Model> for Entity`: rows carry enums as text, so decoding can fail
//! - `*Insert` structs: entity fields flattened into bind-ready values

mod activity;
mod batch_job;
mod notification;
mod poll;
mod target;

pub use activity::ActivityInsert;
pub use batch_job::BatchJobInsert;
pub use notification::NotificationInsert;
pub use poll::{indices_from_db, indices_to_db, PollInsert};
pub use target::{reaction_counts, TargetInsert};

use engage_core::error::DomainError;
use engage_core::value_objects::Scope;

/// Stored enum text that no longer parses is a data problem, not a client one
pub(crate) fn corrupt(column: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::DatabaseError(format!("invalid {column} column: {err}"))
}

pub(crate) fn scope_from_columns(
    campus_id: Option<String>,
    department_id: Option<String>,
    batch: Option<String>,
) -> Scope {
    Scope {
        campus_id,
        department_id,
        batch,
    }
}
