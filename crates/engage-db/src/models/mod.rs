//! Database models - SQLx-compatible row structs

mod activity;
mod batch_job;
mod contribution;
mod notification;
mod poll;
mod target;

pub use activity::ActivityLogModel;
pub use batch_job::BatchJobModel;
pub use contribution::{CommunityStatsRow, HelpdeskStatsRow, PaperStatsRow, ReviewStatsRow};
pub use notification::NotificationModel;
pub use poll::{PollModel, PollVoteModel};
pub use target::{BookmarkModel, ReactionCountModel, TargetModel};
