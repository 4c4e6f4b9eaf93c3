//! # engage-service
//!
//! Application layer: the toggle coordinator, poll engine, notification
//! dispatcher, batch worker, leaderboard aggregator and activity log, plus
//! the request/response DTOs the API crate speaks.

pub mod dto;
pub mod services;

pub use services::{
    ActivityDraft, ActivityService, BatchService, BatchSettings, BatchWorker, InFlightLease,
    LeaderboardService, NotificationService, PollService, ServiceContext, ServiceContextBuilder,
    ServiceError, ServiceResult, SideEffects, TargetService, ToggleService, MAX_ACTIVITY_PAGE,
};
