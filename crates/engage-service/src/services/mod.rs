//! Engagement services
//!
//! Each service borrows a [`ServiceContext`] and owns one slice of the
//! engine: toggles, polls, notifications, batch jobs, leaderboards and the
//! activity log. Side effects that must not fail the triggering action go
//! through [`SideEffects`].

pub mod activity;
pub mod batch;
pub mod context;
pub mod error;
pub mod inflight;
pub mod leaderboard;
pub mod notification;
pub mod poll;
pub mod side_effects;
pub mod target;
pub mod toggle;

pub use activity::{ActivityDraft, ActivityService, MAX_ACTIVITY_PAGE};
pub use batch::{BatchService, BatchWorker};
pub use context::{BatchSettings, ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use inflight::InFlightLease;
pub use leaderboard::LeaderboardService;
pub use notification::NotificationService;
pub use poll::PollService;
pub use side_effects::{SideEffectFailure, SideEffects};
pub use target::TargetService;
pub use toggle::ToggleService;
