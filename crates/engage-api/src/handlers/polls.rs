//! Poll handlers

use axum::{extract::State, Json};
use engage_service::dto::{CreatePollRequest, PollResponse, VoteRequest};
use engage_service::PollService;

use crate::extractors::{AuthUser, IdPath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Create a poll owned by the caller
///
/// POST /polls
pub async fn create_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreatePollRequest>,
) -> ApiResult<Created<Json<PollResponse>>> {
    let service = PollService::new(state.service_context());
    let poll = service.create(body.into_draft(auth.user_id())).await?;
    Ok(Created(Json(poll)))
}

/// GET /polls/{id}
pub async fn get_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(poll_id): IdPath,
) -> ApiResult<Json<PollResponse>> {
    let service = PollService::new(state.service_context());
    Ok(Json(service.get(auth.user_id(), poll_id).await?))
}

/// Replace the caller's selection
///
/// POST /polls/{id}/vote
pub async fn vote(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(poll_id): IdPath,
    ValidatedJson(body): ValidatedJson<VoteRequest>,
) -> ApiResult<Json<PollResponse>> {
    let service = PollService::new(state.service_context());
    let poll = service.vote(&auth.actor, poll_id, &body.option_indices).await?;
    Ok(Json(poll))
}

/// POST /polls/{id}/close
pub async fn close_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(poll_id): IdPath,
) -> ApiResult<Json<PollResponse>> {
    let service = PollService::new(state.service_context());
    Ok(Json(service.close(&auth.actor, poll_id).await?))
}
