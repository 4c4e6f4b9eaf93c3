//! Notification handlers
//!
//! Inbox, read receipts, engagement events from content services and
//! batch notification jobs.

use axum::{extract::State, Json};
use engage_core::{BatchNotificationJob, BatchStatus, EngagementEvent};
use engage_service::dto::{
    BatchListParams, CreateBatchJobRequest, DispatchResponse, InboxParams, InboxResponse,
    MarkReadRequest, MarkReadResponse, PaginatedResponse, ProcessResponse, TransitionRequest,
};
use engage_service::{BatchService, BatchWorker, NotificationService, ServiceError};

use crate::extractors::{AuthUser, IdPath, JsonBody, QueryParams, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// The caller's inbox, newest first
///
/// GET /notifications
pub async fn inbox(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(params): QueryParams<InboxParams>,
) -> ApiResult<Json<InboxResponse>> {
    let service = NotificationService::new(state.service_context());
    let inbox = service
        .inbox(auth.user_id(), params.limit, params.offset, params.unread_only)
        .await?;
    Ok(Json(inbox))
}

/// Mark some or all of the caller's notifications read
///
/// PATCH /notifications
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<MarkReadRequest>,
) -> ApiResult<Json<MarkReadResponse>> {
    let selection = body.selection()?;
    let service = NotificationService::new(state.service_context());
    Ok(Json(service.mark_read(auth.user_id(), selection).await?))
}

/// Dispatch notifications for an engagement event performed by the caller
///
/// POST /engagement-events
pub async fn engagement_event(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(event): JsonBody<EngagementEvent>,
) -> ApiResult<Created<Json<DispatchResponse>>> {
    if let Some(actor) = event.actor() {
        if actor.id != auth.user_id() {
            return Err(ServiceError::forbidden("event actor must be the caller").into());
        }
    }

    let service = NotificationService::new(state.service_context());
    let created = service.dispatch(&event).await?;
    Ok(Created(Json(DispatchResponse { created })))
}

/// Schedule a batch notification job
///
/// POST /notifications/batch
pub async fn create_batch_job(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateBatchJobRequest>,
) -> ApiResult<Created<Json<BatchNotificationJob>>> {
    let service = BatchService::new(state.service_context());
    let job = service.create(body.into_draft(auth.user_id())).await?;
    Ok(Created(Json(job)))
}

/// GET /notifications/batch
pub async fn list_batch_jobs(
    State(state): State<AppState>,
    _auth: AuthUser,
    QueryParams(params): QueryParams<BatchListParams>,
) -> ApiResult<Json<PaginatedResponse<BatchNotificationJob>>> {
    let status = params.status()?;
    let service = BatchService::new(state.service_context());
    let (jobs, limit, offset) = service.list(status, params.limit, params.offset).await?;
    Ok(Json(PaginatedResponse::new(jobs, limit, offset, None)))
}

/// GET /notifications/batch/{id}
pub async fn get_batch_job(
    State(state): State<AppState>,
    _auth: AuthUser,
    IdPath(id): IdPath,
) -> ApiResult<Json<BatchNotificationJob>> {
    Ok(Json(BatchService::new(state.service_context()).get(id).await?))
}

/// Move a job along its status machine
///
/// POST /notifications/batch/{id}/transition
pub async fn transition_batch_job(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<TransitionRequest>,
) -> ApiResult<Json<BatchNotificationJob>> {
    let next: BatchStatus = body.status.parse()?;
    let service = BatchService::new(state.service_context());
    let job = service
        .transition(auth.user_id(), id, next, body.error_message)
        .await?;
    Ok(Json(job))
}

/// POST /notifications/batch/{id}/cancel
pub async fn cancel_batch_job(
    State(state): State<AppState>,
    auth: AuthUser,
    IdPath(id): IdPath,
) -> ApiResult<Json<BatchNotificationJob>> {
    let service = BatchService::new(state.service_context());
    Ok(Json(service.cancel(auth.user_id(), id).await?))
}

/// Run one processor tick now
///
/// POST /notifications/batch/process
pub async fn process_batch_jobs(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<ProcessResponse>> {
    let worker = BatchWorker::new(state.service_context().clone());
    let processed = worker.tick().await?;
    Ok(Json(ProcessResponse { processed }))
}
