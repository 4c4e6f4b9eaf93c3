//! Repository traits (ports) - the Record Store contract
//!
//! Every mutation that touches a shared counter is a single method here, so
//! implementations can apply the edge change and the counter delta as one
//! atomic unit. Nothing above this layer reads a counter, computes a new
//! value and writes it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    ActivityFilter, ActivityLogEntry, BatchJobQuery, BatchNotificationJob, BatchStatus,
    BookmarkEdge, CommunityStats, EngagementTarget, HelpdeskStats, InboxQuery, Notification,
    PaperStats, Poll, PollVote, ReactionCounts, ReactionKind, ReviewStats, TargetRef,
    ToggleOutcome,
};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Targets
// ============================================================================

#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Register a target (or refresh its owner/scope/preview); counters are kept
    async fn upsert(&self, target: &EngagementTarget) -> RepoResult<()>;

    /// Live target with current counters; `None` once deleted
    async fn find(&self, target: TargetRef) -> RepoResult<Option<EngagementTarget>>;

    /// Mark a target deleted; later toggles on it fail with `NotFound`
    async fn delete(&self, target: TargetRef) -> RepoResult<()>;
}

// ============================================================================
// Reactions & Bookmarks
// ============================================================================

#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Insert the edge if absent (counter +1) or delete it if present
    /// (counter -1, floored at 0), atomically. `NotFound` if the target is
    /// missing or deleted.
    async fn toggle(
        &self,
        user_id: Snowflake,
        target: TargetRef,
        kind: ReactionKind,
    ) -> RepoResult<ToggleOutcome>;

    async fn counts(&self, target: TargetRef) -> RepoResult<ReactionCounts>;

    /// Kinds the user currently has on the target
    async fn kinds_for_user(
        &self,
        user_id: Snowflake,
        target: TargetRef,
    ) -> RepoResult<Vec<ReactionKind>>;
}

#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Same contract as [`ReactionRepository::toggle`], on the post's bookmark counter
    async fn toggle(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<ToggleOutcome>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Snowflake,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<BookmarkEdge>>;
}

// ============================================================================
// Polls
// ============================================================================

#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn create(&self, poll: &Poll) -> RepoResult<()>;

    async fn find(&self, id: Snowflake) -> RepoResult<Option<Poll>>;

    async fn find_vote(&self, poll_id: Snowflake, user_id: Snowflake)
        -> RepoResult<Option<PollVote>>;

    /// Replace the user's selection and adjust tallies as one atomic step.
    ///
    /// Implementations check [`Poll::ensure_open`] and
    /// [`Poll::validate_selection`] against the locked row and apply
    /// [`Poll::replace_vote`]. Returns the poll after the change.
    async fn replace_vote(
        &self,
        poll_id: Snowflake,
        user_id: Snowflake,
        indices: &[usize],
        now: DateTime<Utc>,
    ) -> RepoResult<Poll>;

    /// Set `is_active = false`; returns the updated poll
    async fn close(&self, id: Snowflake) -> RepoResult<Poll>;
}

// ============================================================================
// Notifications
// ============================================================================

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert unless an unread notification with the same
    /// [`Notification::dedup_key`] exists. Returns whether a row was written.
    async fn insert_unless_duplicate(&self, notification: &Notification) -> RepoResult<bool>;

    /// Newest first
    async fn list(&self, query: &InboxQuery) -> RepoResult<Vec<Notification>>;

    async fn unread_count(&self, recipient_id: Snowflake) -> RepoResult<i64>;

    /// Stamp `read_at` on the given ids (or every unread one when `ids` is
    /// `None`) belonging to the recipient. Returns the number updated.
    async fn mark_read(
        &self,
        recipient_id: Snowflake,
        ids: Option<&[Snowflake]>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64>;
}

#[async_trait]
pub trait BatchJobRepository: Send + Sync {
    async fn create(&self, job: &BatchNotificationJob) -> RepoResult<()>;

    async fn find(&self, id: Snowflake) -> RepoResult<Option<BatchNotificationJob>>;

    /// Newest first
    async fn list(&self, query: &BatchJobQuery) -> RepoResult<Vec<BatchNotificationJob>>;

    /// Pending jobs due at `now`, oldest first
    async fn due(&self, now: DateTime<Utc>, limit: i64) -> RepoResult<Vec<BatchNotificationJob>>;

    /// Persist `job`'s status fields only if the stored status is still
    /// `expected`. Returns `false` when another writer got there first.
    async fn compare_and_set(
        &self,
        job: &BatchNotificationJob,
        expected: BatchStatus,
    ) -> RepoResult<bool>;

    async fn record_progress(&self, id: Snowflake, processed: i64, progress: i32)
        -> RepoResult<()>;
}

// ============================================================================
// Activity Log
// ============================================================================

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append(&self, entry: &ActivityLogEntry) -> RepoResult<()>;

    /// Page of matching entries, newest first, plus the total match count
    async fn list(&self, filter: &ActivityFilter) -> RepoResult<(Vec<ActivityLogEntry>, i64)>;

    /// Every entry with `start <= created_at <= end`
    async fn in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<ActivityLogEntry>>;
}

// ============================================================================
// Contribution Sources
// ============================================================================

/// Which users a leaderboard ranks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardScope {
    pub campus_id: Option<String>,
    pub department_id: Option<String>,
}

/// Read-only view over the independent activity tables the scores come from.
///
/// Each category is a separate query so one unreachable source only
/// degrades that category.
#[async_trait]
pub trait ContributionRepository: Send + Sync {
    async fn contributors(&self, scope: &LeaderboardScope) -> RepoResult<Vec<Snowflake>>;

    async fn paper_stats(&self, user_id: Snowflake) -> RepoResult<PaperStats>;

    async fn review_stats(&self, user_id: Snowflake, detail_chars: i64) -> RepoResult<ReviewStats>;

    async fn community_stats(
        &self,
        user_id: Snowflake,
        popular_likes: i64,
    ) -> RepoResult<CommunityStats>;

    async fn helpdesk_stats(&self, user_id: Snowflake) -> RepoResult<HelpdeskStats>;
}

// ============================================================================
// In-flight guard
// ============================================================================

/// Proof of holding an in-flight key.
///
/// Keys expire, so a slow holder may find its key taken over by a newer
/// request. Release only succeeds for the token that currently holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InFlightToken(String);

impl InFlightToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Marks a `(user, target, kind)` operation as running so a duplicate
/// concurrent request can be rejected with `Conflict`
#[async_trait]
pub trait InFlightGuard: Send + Sync {
    /// A fresh token if the key was free (or expired) and is now held
    async fn try_acquire(&self, key: &str) -> RepoResult<Option<InFlightToken>>;

    /// Free the key if `token` still holds it. `false` means the key had
    /// expired and was left alone.
    async fn release(&self, key: &str, token: &InFlightToken) -> RepoResult<bool>;
}
