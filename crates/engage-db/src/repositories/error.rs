//! Error handling utilities for repositories

use engage_core::entities::TargetRef;
use engage_core::error::DomainError;
use engage_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError.
///
/// Connection-level failures become `Unavailable` so callers can tell an
/// unreachable store apart from a bad query.
pub fn map_db_error(e: SqlxError) -> DomainError {
    match e {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
            DomainError::Unavailable(format!("record store: {e}"))
        }
        other => DomainError::DatabaseError(other.to_string()),
    }
}

pub fn target_not_found(target: TargetRef) -> DomainError {
    DomainError::not_found("target", target)
}

pub fn poll_not_found(id: Snowflake) -> DomainError {
    DomainError::not_found("poll", id)
}

pub fn batch_job_not_found(id: Snowflake) -> DomainError {
    DomainError::not_found("batch job", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        assert!(map_db_error(SqlxError::PoolTimedOut).is_unavailable());
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        assert!(matches!(
            map_db_error(SqlxError::RowNotFound),
            DomainError::DatabaseError(_)
        ));
    }
}
