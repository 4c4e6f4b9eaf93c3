//! Ports implemented by the infrastructure crates

mod repositories;

pub use repositories::{
    ActivityRepository, BatchJobRepository, BookmarkRepository, ContributionRepository,
    InFlightGuard, InFlightToken, LeaderboardScope, NotificationRepository, PollRepository,
    ReactionRepository, RepoResult, TargetRepository,
};
