//! # engage-core
//!
//! Domain layer of the engagement engine: entities, value objects, scoring
//! rules, events and the repository ports the infrastructure crates implement.
//! This crate has no dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    ActivityAnalytics, ActivityFilter, ActivityLogEntry, ActivityStatistics, AnalyticsPeriod,
    Badge, BatchJobDraft, BatchJobQuery, BatchNotificationJob, BatchStatus, BookmarkEdge,
    Breakdown, EngagementTarget, InboxQuery, LeaderboardCategory, LeaderboardEntry,
    Notification, NotificationDraft, NotificationKind, NotificationTemplate, Poll, PollDraft,
    PollVote, ReactionCounts, ReactionEdge, ReactionKind, RelatedType, ScoringWeights,
    TargetRef, TargetType, ToggleOutcome,
};
pub use error::DomainError;
pub use events::{Actor, ChangeEvent, ChangeOp, EngagementEvent, EntityType};
pub use traits::{
    ActivityRepository, BatchJobRepository, BookmarkRepository, ContributionRepository,
    InFlightGuard, InFlightToken, LeaderboardScope, NotificationRepository, PollRepository,
    ReactionRepository, RepoResult, TargetRepository,
};
pub use value_objects::{Scope, ScopeFilter, Snowflake, SnowflakeGenerator, SnowflakeParseError};
