//! Service layer error types
//!
//! Wraps domain errors and adds the failures only the application layer
//! can detect (ownership checks, rejected duplicates that carry the
//! authoritative state back to the caller).

use engage_common::{domain_status, AppError};
use engage_core::DomainError;
use std::fmt;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation or record store failure
    Domain(DomainError),

    /// Application error (identity, validation, etc.)
    App(AppError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Caller is authenticated but not allowed to touch the resource
    Forbidden(String),

    /// Caller identity is missing or does not match the request
    Unauthorized(String),

    /// Validation error
    Validation(String),

    /// Duplicate in-flight request. `current` is the authoritative state
    /// (counter, tally) at rejection time so the client can self-correct.
    Conflict {
        message: String,
        current: Option<serde_json::Value>,
    },

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
            current: None,
        }
    }

    /// Conflict that reports the state the caller should converge to
    pub fn conflict_with(msg: impl Into<String>, current: serde_json::Value) -> Self {
        Self::Conflict {
            message: msg.into(),
            current: Some(current),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => domain_status(e),
            Self::App(e) => e.status_code(),
            Self::NotFound { .. } => 404,
            Self::Forbidden(_) => 403,
            Self::Unauthorized(_) => 401,
            Self::Validation(_) => 400,
            Self::Conflict { .. } => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Extra body content for the error response
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Conflict { current, .. } => current.as_ref(),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_unavailable())
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_not_found(),
            Self::NotFound { .. } => true,
            _ => false,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::NotFound { resource, id } => AppError::Domain(DomainError::NotFound {
                entity: resource,
                id,
            }),
            ServiceError::Forbidden(msg) => AppError::Forbidden(msg),
            ServiceError::Unauthorized(_) => AppError::MissingAuth,
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Conflict { message, .. } => AppError::Domain(DomainError::Conflict(message)),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_status() {
        let err = ServiceError::from(DomainError::invalid_state("poll is not active"));
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_STATE");

        let err = ServiceError::from(DomainError::Unavailable("store offline".into()));
        assert_eq!(err.status_code(), 503);
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_not_found_error() {
        let err = ServiceError::not_found("Poll", 123);
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.to_string().contains("Poll not found: 123"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_conflict_carries_current_state() {
        let err = ServiceError::conflict_with(
            "toggle already in flight",
            serde_json::json!({"newCount": 4}),
        );
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.details().unwrap()["newCount"], 4);
        assert!(ServiceError::conflict("x").details().is_none());
    }

    #[test]
    fn test_convert_to_app_error() {
        let app_err: AppError = ServiceError::forbidden("not the poll creator").into();
        assert_eq!(app_err.status_code(), 403);

        let app_err: AppError = ServiceError::not_found("Batch job", "9").into();
        assert_eq!(app_err.status_code(), 404);

        let err = ServiceError::unauthorized("no identity");
        assert_eq!(err.status_code(), 401);
        let app_err: AppError = err.into();
        assert_eq!(app_err.error_code(), "MISSING_AUTH");
    }
}
