//! Activity log handlers

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    Json,
};
use engage_core::{ActivityAnalytics, ActivityFilter, ActivityLogEntry, ActivityStatistics};
use engage_service::dto::{
    ActivityListParams, AnalyticsParams, PaginatedResponse, RecordActivityRequest, StatsParams,
};
use engage_service::{ActivityDraft, ActivityService, MAX_ACTIVITY_PAGE};

use crate::extractors::{AuthUser, QueryParams, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// First hop of `x-forwarded-for`, then the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Record an entry for the caller
///
/// POST /activity-logs
pub async fn record_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<RecordActivityRequest>,
) -> ApiResult<Created<Json<ActivityLogEntry>>> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let draft = ActivityDraft {
        resource_type: body.resource_type,
        resource_id: body.resource_id,
        ..ActivityDraft::new(auth.user_id(), body.action)
    }
    .details(body.details)
    .client(client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)), user_agent);

    let entry = ActivityService::new(state.service_context()).record(draft).await?;
    Ok(Created(Json(entry)))
}

/// GET /activity-logs
pub async fn list_activity(
    State(state): State<AppState>,
    _auth: AuthUser,
    QueryParams(params): QueryParams<ActivityListParams>,
) -> ApiResult<Json<PaginatedResponse<ActivityLogEntry>>> {
    let filter: ActivityFilter = params.into();
    let (limit, offset) = (filter.limit.clamp(1, MAX_ACTIVITY_PAGE), filter.offset.max(0));

    let service = ActivityService::new(state.service_context());
    let (entries, total) = service.list(filter).await?;
    Ok(Json(PaginatedResponse::new(entries, limit, offset, Some(total))))
}

/// Counts by action, resource and day; defaults to the last 30 days
///
/// GET /activity-logs/stats?startDate=&endDate=
pub async fn activity_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
    QueryParams(params): QueryParams<StatsParams>,
) -> ApiResult<Json<ActivityStatistics>> {
    let service = ActivityService::new(state.service_context());
    let stats = service.statistics(params.start_date, params.end_date).await?;
    Ok(Json(stats))
}

/// GET /activity-logs/analytics?period=
pub async fn activity_analytics(
    State(state): State<AppState>,
    _auth: AuthUser,
    QueryParams(params): QueryParams<AnalyticsParams>,
) -> ApiResult<Json<ActivityAnalytics>> {
    let period = params.period()?;
    let service = ActivityService::new(state.service_context());
    Ok(Json(service.analytics(period).await?))
}
