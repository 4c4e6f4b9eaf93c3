//! In-memory record store
//!
//! Implements every repository port over one mutex-guarded state, so each
//! trait method is atomic in the same sense as the PostgreSQL transactions.
//! Backs `STORE_BACKEND=memory` and the service and API test suites, which
//! also use the outage and per-source failure switches.

mod activity;
mod contribution;
mod engagement;
mod notification;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use engage_core::entities::{
    ActivityLogEntry, BatchNotificationJob, EngagementTarget, LeaderboardCategory, Notification,
    Poll, PollVote, ReactionKind, TargetRef,
};
use engage_core::error::DomainError;
use engage_core::traits::RepoResult;
use engage_core::value_objects::Snowflake;

pub use contribution::{ContributorRecord, PaperRecord, PostRecord, ReviewRecord, TicketRecord};

#[derive(Default)]
struct State {
    targets: HashMap<TargetRef, EngagementTarget>,
    deleted: HashSet<TargetRef>,
    reactions: HashMap<(Snowflake, TargetRef, ReactionKind), DateTime<Utc>>,
    bookmarks: HashMap<(Snowflake, Snowflake), DateTime<Utc>>,
    polls: HashMap<Snowflake, Poll>,
    votes: HashMap<(Snowflake, Snowflake), PollVote>,
    notifications: Vec<Notification>,
    jobs: HashMap<Snowflake, BatchNotificationJob>,
    activity: Vec<ActivityLogEntry>,
    contributors: HashMap<Snowflake, ContributorRecord>,
    failing_sources: HashSet<(LeaderboardCategory, Option<Snowflake>)>,
    contributors_down: bool,
}

/// Cheap to clone; clones share state
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    outage: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every repository call fails with `Unavailable`
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    /// Make one contribution source fail, for one user or (`None`) everyone
    pub fn fail_source(&self, category: LeaderboardCategory, user_id: Option<Snowflake>) {
        self.state.lock().failing_sources.insert((category, user_id));
    }

    /// Make the contributor listing itself fail
    pub fn fail_contributors(&self) {
        self.state.lock().contributors_down = true;
    }

    pub fn seed_contributor(&self, user_id: Snowflake, record: ContributorRecord) {
        self.state.lock().contributors.insert(user_id, record);
    }

    /// Snapshot of every stored notification, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    fn available(&self) -> RepoResult<()> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable("record store offline".into()));
        }
        Ok(())
    }
}
