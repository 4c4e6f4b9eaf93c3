//! Path parameter extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use engage_core::entities::{TargetRef, TargetType};
use engage_core::Snowflake;
use serde::Deserialize;

use crate::response::ApiError;

#[derive(Debug, Deserialize)]
struct RawIdPath {
    id: String,
}

/// `/{id}` as a Snowflake
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Snowflake);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<RawIdPath>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;
        let id = raw
            .id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid id format"))?;
        Ok(IdPath(id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTargetPath {
    target_type: String,
    target_id: String,
}

/// `/{targetType}/{targetId}`
#[derive(Debug, Clone, Copy)]
pub struct TargetPath(pub TargetRef);

#[async_trait]
impl<S> FromRequestParts<S> for TargetPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<RawTargetPath>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;
        let target_type: TargetType = raw
            .target_type
            .parse()
            .map_err(|_| ApiError::invalid_path(format!("Unknown target type: {}", raw.target_type)))?;
        let target_id = raw
            .target_id
            .parse()
            .map_err(|_| ApiError::invalid_path("Invalid targetId format"))?;
        Ok(TargetPath(TargetRef::new(target_type, target_id)))
    }
}
