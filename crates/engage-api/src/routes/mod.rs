//! Route definitions
//!
//! Engine routes mounted under /api/v1; health probes at the root and under
//! /api/v1 so they can bypass rate limiting.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{activity, health, leaderboard, notifications, polls, reactions, realtime, targets};
use crate::state::AppState;

/// Prefix of every engine route
pub const API_PREFIX: &str = "/api/v1";

/// Create the main API router (health routes are mounted separately)
pub fn create_router() -> Router<AppState> {
    Router::new().nest(API_PREFIX, api_v1_routes())
}

/// Health check routes, exported separately to bypass rate limiting
pub fn health_routes() -> Router<AppState> {
    let probes = || {
        Router::new()
            .route("/health", get(health::health_check))
            .route("/health/live", get(health::health_check))
            .route("/health/ready", get(health::readiness_check))
    };
    probes().nest(API_PREFIX, probes())
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(target_routes())
        .merge(toggle_routes())
        .merge(poll_routes())
        .merge(notification_routes())
        .merge(leaderboard_routes())
        .merge(activity_routes())
        .route("/realtime", get(realtime::realtime_handler))
}

/// Engagement target registry
fn target_routes() -> Router<AppState> {
    Router::new().route(
        "/targets/:targetType/:targetId",
        put(targets::register_target)
            .get(targets::get_target)
            .delete(targets::delete_target),
    )
}

/// Reactions and bookmarks
fn toggle_routes() -> Router<AppState> {
    Router::new()
        .route("/reactions", post(reactions::toggle_reaction))
        .route("/reactions/:targetType/:targetId", get(reactions::get_reactions))
        .route(
            "/bookmarks",
            post(reactions::toggle_bookmark).get(reactions::list_bookmarks),
        )
}

fn poll_routes() -> Router<AppState> {
    Router::new()
        .route("/polls", post(polls::create_poll))
        .route("/polls/:id", get(polls::get_poll))
        .route("/polls/:id/vote", post(polls::vote))
        .route("/polls/:id/close", post(polls::close_poll))
}

/// Inbox, engagement events and batch jobs
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(notifications::inbox).patch(notifications::mark_read),
        )
        .route("/engagement-events", post(notifications::engagement_event))
        .route(
            "/notifications/batch",
            post(notifications::create_batch_job).get(notifications::list_batch_jobs),
        )
        .route(
            "/notifications/batch/process",
            post(notifications::process_batch_jobs),
        )
        .route("/notifications/batch/:id", get(notifications::get_batch_job))
        .route(
            "/notifications/batch/:id/transition",
            post(notifications::transition_batch_job),
        )
        .route(
            "/notifications/batch/:id/cancel",
            post(notifications::cancel_batch_job),
        )
}

fn leaderboard_routes() -> Router<AppState> {
    Router::new().route("/leaderboard", get(leaderboard::get_leaderboard))
}

fn activity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/activity-logs",
            post(activity::record_activity).get(activity::list_activity),
        )
        .route("/activity-logs/stats", get(activity::activity_stats))
        .route("/activity-logs/analytics", get(activity::activity_analytics))
}
