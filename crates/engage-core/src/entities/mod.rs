//! Domain entities - core engagement records

mod activity;
mod batch_job;
mod leaderboard;
mod notification;
mod poll;
mod reaction;
mod target;

pub use activity::{
    actions, day_key, ActivityAnalytics, ActivityFilter, ActivityLogEntry, ActivityStatistics,
    AnalyticsPeriod, UserActivityCount, UNKNOWN_BUCKET,
};
pub use batch_job::{
    progress_percent, BatchJobDraft, BatchJobQuery, BatchNotificationJob, BatchStatus,
    NotificationTemplate,
};
pub use leaderboard::{
    rank_users, Badge, Breakdown, CommunityStats, HelpdeskStats, LeaderboardCategory,
    LeaderboardEntry, PaperStats, ReviewStats, ScoredUser, ScoringWeights,
};
pub use notification::{
    preview, InboxQuery, Notification, NotificationDraft, NotificationKind, RelatedType,
    PREVIEW_CHARS,
};
pub use poll::{Poll, PollDraft, PollVote};
pub use reaction::{BookmarkEdge, ReactionEdge, ReactionKind};
pub use target::{EngagementTarget, ReactionCounts, TargetRef, TargetType, ToggleOutcome};
