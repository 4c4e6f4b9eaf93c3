//! Realtime fan-out over WebSocket
//!
//! Each connection subscribes to the hub with the scope filter from its
//! query string and receives every matching change event as a JSON text
//! frame. Nothing is replayed; clients re-fetch after reconnecting.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use engage_cache::Subscription;
use engage_core::ScopeFilter;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::extractors::{AuthUser, QueryParams};
use crate::response::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeParams {
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
    /// `__all__` or absent means every batch
    pub batch: Option<String>,
    /// Browsers cannot set headers on a WebSocket handshake
    pub token: Option<String>,
}

/// GET /realtime?campusId=&departmentId=&batch=
pub async fn realtime_handler(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    QueryParams(params): QueryParams<RealtimeParams>,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let auth = match (auth, params.token.as_deref()) {
        (Some(auth), _) => auth,
        (None, Some(token)) => AuthUser::from_token(&state, token)?,
        (None, None) => return Err(ApiError::MissingAuth),
    };

    let filter = ScopeFilter::new(params.campus_id, params.department_id, params.batch)
        .for_viewer(auth.user_id());
    // Subscribe before the upgrade so no event published meanwhile is missed
    let subscription = state.service_context().fanout().subscribe(filter);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription, auth)))
}

async fn handle_socket(socket: WebSocket, mut subscription: Subscription, auth: AuthUser) {
    let subscriber = subscription.id();
    tracing::info!(user_id = %auth.user_id(), subscriber, "Realtime stream opened");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode change event");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        // Hub dropped us (slow consumer) or the socket is gone
        let _ = ws_sink.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                // Pings are answered by axum; the stream is server to client only
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Realtime socket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(subscriber, "Realtime send task ended");
        }
        _ = &mut recv_task => {
            tracing::debug!(subscriber, "Client closed realtime stream");
        }
    }

    // The send task owns the subscription; it must be gone before we return
    send_task.abort();
    recv_task.abort();
    let _ = send_task.await;
    let _ = recv_task.await;

    tracing::info!(user_id = %auth.user_id(), subscriber, "Realtime stream closed");
}
