//! Leaderboard handler

use axum::{extract::State, Json};
use engage_service::dto::{LeaderboardParams, LeaderboardResponse};
use engage_service::LeaderboardService;

use crate::extractors::{AuthUser, QueryParams};
use crate::response::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /leaderboard?category=&campusId=&departmentId=&limit=
pub async fn get_leaderboard(
    State(state): State<AppState>,
    _auth: AuthUser,
    QueryParams(params): QueryParams<LeaderboardParams>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let category = params.category()?;
    let limit = params
        .limit
        .map(|l| usize::try_from(l).map_err(|_| ApiError::invalid_query("limit must be positive")))
        .transpose()?;

    let service = LeaderboardService::new(state.service_context());
    let board = service.compute(params.scope(), category, limit).await?;
    Ok(Json(board))
}
