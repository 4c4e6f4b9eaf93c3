//! Engagement target handlers
//!
//! Content services register the things users can react to here, so the
//! engine knows each target's owner and scope.

use axum::{extract::State, Json};
use engage_service::dto::{RegisterTargetRequest, TargetResponse};
use engage_service::TargetService;

use crate::extractors::{AuthUser, TargetPath, ValidatedJson};
use crate::response::{ApiResult, NoContent};
use crate::state::AppState;

/// Register or refresh a target
///
/// PUT /targets/{targetType}/{targetId}
pub async fn register_target(
    State(state): State<AppState>,
    _auth: AuthUser,
    TargetPath(target): TargetPath,
    ValidatedJson(body): ValidatedJson<RegisterTargetRequest>,
) -> ApiResult<Json<TargetResponse>> {
    let service = TargetService::new(state.service_context());
    let target = service.register(body.into_target(target)).await?;
    Ok(Json(TargetResponse { target }))
}

/// Target with its counters
///
/// GET /targets/{targetType}/{targetId}
pub async fn get_target(
    State(state): State<AppState>,
    _auth: AuthUser,
    TargetPath(target): TargetPath,
) -> ApiResult<Json<TargetResponse>> {
    let target = TargetService::new(state.service_context()).get(target).await?;
    Ok(Json(TargetResponse { target }))
}

/// Mark a target deleted
///
/// DELETE /targets/{targetType}/{targetId}
pub async fn delete_target(
    State(state): State<AppState>,
    _auth: AuthUser,
    TargetPath(target): TargetPath,
) -> ApiResult<NoContent> {
    TargetService::new(state.service_context()).remove(target).await?;
    Ok(NoContent)
}
