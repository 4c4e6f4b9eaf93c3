//! Reaction and bookmark handlers

use axum::{extract::State, Json};
use engage_service::dto::{
    BookmarkResponse, BookmarkToggleResponse, PageParams, PaginatedResponse,
    ReactionSummaryResponse, ReactionToggleResponse, ToggleBookmarkRequest, ToggleReactionRequest,
};
use engage_service::ToggleService;

use crate::extractors::{AuthUser, JsonBody, QueryParams, TargetPath, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Toggle the caller's reaction on a target
///
/// POST /reactions
pub async fn toggle_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<ToggleReactionRequest>,
) -> ApiResult<Json<ReactionToggleResponse>> {
    let target = body.target()?;
    let kind = body.kind()?;

    let service = ToggleService::new(state.service_context());
    let response = service.toggle_reaction(&auth.actor, target, kind).await?;
    Ok(Json(response))
}

/// Counts on a target plus the caller's own kinds
///
/// GET /reactions/{targetType}/{targetId}
pub async fn get_reactions(
    State(state): State<AppState>,
    auth: AuthUser,
    TargetPath(target): TargetPath,
) -> ApiResult<Json<ReactionSummaryResponse>> {
    let service = ToggleService::new(state.service_context());
    Ok(Json(service.reactions(auth.user_id(), target).await?))
}

/// Toggle a bookmark on a post
///
/// POST /bookmarks
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<ToggleBookmarkRequest>,
) -> ApiResult<Json<BookmarkToggleResponse>> {
    let service = ToggleService::new(state.service_context());
    Ok(Json(service.toggle_bookmark(&auth.actor, body.post_id).await?))
}

/// The caller's bookmarks, newest first
///
/// GET /bookmarks
pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult<Json<PaginatedResponse<BookmarkResponse>>> {
    let service = ToggleService::new(state.service_context());
    let (bookmarks, limit, offset) = service
        .bookmarks(auth.user_id(), page.limit, page.offset)
        .await?;
    Ok(Json(PaginatedResponse::new(bookmarks, limit, offset, None)))
}
