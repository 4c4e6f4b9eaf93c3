//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs

pub mod requests;
pub mod responses;

pub use requests::{
    parse_target, ActivityListParams, AnalyticsParams, BatchListParams, CreateBatchJobRequest,
    CreatePollRequest, InboxParams, LeaderboardParams, MarkReadRequest, PageParams,
    RecordActivityRequest, RegisterTargetRequest, StatsParams, ToggleBookmarkRequest,
    ToggleReactionRequest, TransitionRequest, VoteRequest,
};

pub use responses::{
    ApiResponse, BookmarkResponse, BookmarkToggleResponse, DispatchResponse, HealthChecks,
    HealthResponse, InboxResponse, LeaderboardResponse, MarkReadResponse, PaginatedResponse,
    PaginationMeta, PollResponse, ProcessResponse, ReactionSummaryResponse,
    ReactionToggleResponse, ReadinessResponse, TargetResponse,
};
