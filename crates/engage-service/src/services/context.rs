//! Service context - dependency container for services
//!
//! Holds the record store ports, the fan-out hub, the in-flight guard and
//! the side-effect runner. Every field is reference counted, so the
//! context is cheap to clone into background effects.

use std::sync::Arc;
use std::time::Duration;

use engage_cache::{FanoutHub, LocalInFlight};
use engage_common::EngineConfig;
use engage_core::traits::{
    ActivityRepository, BatchJobRepository, BookmarkRepository, ContributionRepository,
    InFlightGuard, NotificationRepository, PollRepository, ReactionRepository, TargetRepository,
};
use engage_core::{ChangeEvent, ScoringWeights, Snowflake, SnowflakeGenerator};
use engage_db::{
    MemoryStore, PgActivityRepository, PgBatchJobRepository, PgBookmarkRepository,
    PgContributionRepository, PgNotificationRepository, PgPollRepository, PgPool,
    PgReactionRepository, PgTargetRepository,
};

use super::error::{ServiceError, ServiceResult};
use super::inflight::InFlightLease;
use super::side_effects::SideEffects;

/// Batch processor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Jobs claimed per tick
    pub jobs_per_tick: i64,
    /// Persist progress after this many recipients
    pub progress_every: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            jobs_per_tick: 5,
            progress_every: 10,
        }
    }
}

impl BatchSettings {
    /// Both knobs are at least 1; a zero progress interval would divide by zero
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            jobs_per_tick: self.jobs_per_tick.max(1),
            progress_every: self.progress_every.max(1),
        }
    }
}

impl From<&EngineConfig> for BatchSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            jobs_per_tick: config.batch_jobs_per_tick,
            progress_every: config.batch_progress_every,
        }
        .clamped()
    }
}

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Record store ports
    target_repo: Arc<dyn TargetRepository>,
    reaction_repo: Arc<dyn ReactionRepository>,
    bookmark_repo: Arc<dyn BookmarkRepository>,
    poll_repo: Arc<dyn PollRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    batch_repo: Arc<dyn BatchJobRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
    contribution_repo: Arc<dyn ContributionRepository>,

    // Coordination
    inflight: Arc<dyn InFlightGuard>,
    fanout: FanoutHub,
    side_effects: SideEffects,

    snowflake_generator: Arc<SnowflakeGenerator>,
    scoring: Arc<ScoringWeights>,
    batch: BatchSettings,
}

impl ServiceContext {
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Record store ===

    pub fn target_repo(&self) -> &dyn TargetRepository {
        self.target_repo.as_ref()
    }

    pub fn reaction_repo(&self) -> &dyn ReactionRepository {
        self.reaction_repo.as_ref()
    }

    pub fn bookmark_repo(&self) -> &dyn BookmarkRepository {
        self.bookmark_repo.as_ref()
    }

    pub fn poll_repo(&self) -> &dyn PollRepository {
        self.poll_repo.as_ref()
    }

    pub fn notification_repo(&self) -> &dyn NotificationRepository {
        self.notification_repo.as_ref()
    }

    pub fn batch_repo(&self) -> &dyn BatchJobRepository {
        self.batch_repo.as_ref()
    }

    pub fn activity_repo(&self) -> &dyn ActivityRepository {
        self.activity_repo.as_ref()
    }

    pub fn contribution_repo(&self) -> &dyn ContributionRepository {
        self.contribution_repo.as_ref()
    }

    // === Coordination ===

    pub fn inflight(&self) -> &dyn InFlightGuard {
        self.inflight.as_ref()
    }

    /// Hold `key` for one operation; `None` if a duplicate is running
    pub async fn acquire_inflight(
        &self,
        key: impl Into<String>,
    ) -> ServiceResult<Option<InFlightLease>> {
        InFlightLease::acquire(Arc::clone(&self.inflight), key).await
    }

    pub fn fanout(&self) -> &FanoutHub {
        &self.fanout
    }

    pub fn side_effects(&self) -> &SideEffects {
        &self.side_effects
    }

    pub fn scoring(&self) -> &ScoringWeights {
        self.scoring.as_ref()
    }

    pub fn batch_settings(&self) -> BatchSettings {
        self.batch
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }

    /// Publish after a commit. A relay failure is reported, never returned:
    /// local subscribers already have the event.
    pub async fn broadcast(&self, event: ChangeEvent) {
        if let Err(err) = self.fanout.publish(event).await {
            self.side_effects.report("fanout", &err);
        }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("subscribers", &self.fanout.subscriber_count())
            .field("side_effects", &self.side_effects)
            .field("batch", &self.batch)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    target_repo: Option<Arc<dyn TargetRepository>>,
    reaction_repo: Option<Arc<dyn ReactionRepository>>,
    bookmark_repo: Option<Arc<dyn BookmarkRepository>>,
    poll_repo: Option<Arc<dyn PollRepository>>,
    notification_repo: Option<Arc<dyn NotificationRepository>>,
    batch_repo: Option<Arc<dyn BatchJobRepository>>,
    activity_repo: Option<Arc<dyn ActivityRepository>>,
    contribution_repo: Option<Arc<dyn ContributionRepository>>,
    inflight: Option<Arc<dyn InFlightGuard>>,
    fanout: Option<FanoutHub>,
    side_effects: Option<SideEffects>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    scoring: Option<ScoringWeights>,
    batch: BatchSettings,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record store port from the PostgreSQL adapter
    pub fn postgres(self, pool: &PgPool) -> Self {
        self.target_repo(Arc::new(PgTargetRepository::new(pool.clone())))
            .reaction_repo(Arc::new(PgReactionRepository::new(pool.clone())))
            .bookmark_repo(Arc::new(PgBookmarkRepository::new(pool.clone())))
            .poll_repo(Arc::new(PgPollRepository::new(pool.clone())))
            .notification_repo(Arc::new(PgNotificationRepository::new(pool.clone())))
            .batch_repo(Arc::new(PgBatchJobRepository::new(pool.clone())))
            .activity_repo(Arc::new(PgActivityRepository::new(pool.clone())))
            .contribution_repo(Arc::new(PgContributionRepository::new(pool.clone())))
    }

    /// Every record store port from one in-memory store
    pub fn memory(self, store: &MemoryStore) -> Self {
        let store = Arc::new(store.clone());
        self.target_repo(store.clone())
            .reaction_repo(store.clone())
            .bookmark_repo(store.clone())
            .poll_repo(store.clone())
            .notification_repo(store.clone())
            .batch_repo(store.clone())
            .activity_repo(store.clone())
            .contribution_repo(store)
    }

    pub fn target_repo(mut self, repo: Arc<dyn TargetRepository>) -> Self {
        self.target_repo = Some(repo);
        self
    }

    pub fn reaction_repo(mut self, repo: Arc<dyn ReactionRepository>) -> Self {
        self.reaction_repo = Some(repo);
        self
    }

    pub fn bookmark_repo(mut self, repo: Arc<dyn BookmarkRepository>) -> Self {
        self.bookmark_repo = Some(repo);
        self
    }

    pub fn poll_repo(mut self, repo: Arc<dyn PollRepository>) -> Self {
        self.poll_repo = Some(repo);
        self
    }

    pub fn notification_repo(mut self, repo: Arc<dyn NotificationRepository>) -> Self {
        self.notification_repo = Some(repo);
        self
    }

    pub fn batch_repo(mut self, repo: Arc<dyn BatchJobRepository>) -> Self {
        self.batch_repo = Some(repo);
        self
    }

    pub fn activity_repo(mut self, repo: Arc<dyn ActivityRepository>) -> Self {
        self.activity_repo = Some(repo);
        self
    }

    pub fn contribution_repo(mut self, repo: Arc<dyn ContributionRepository>) -> Self {
        self.contribution_repo = Some(repo);
        self
    }

    pub fn inflight(mut self, guard: Arc<dyn InFlightGuard>) -> Self {
        self.inflight = Some(guard);
        self
    }

    pub fn fanout(mut self, hub: FanoutHub) -> Self {
        self.fanout = Some(hub);
        self
    }

    pub fn side_effects(mut self, runner: SideEffects) -> Self {
        self.side_effects = Some(runner);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn scoring(mut self, weights: ScoringWeights) -> Self {
        self.scoring = Some(weights);
        self
    }

    pub fn batch_settings(mut self, settings: BatchSettings) -> Self {
        self.batch = settings.clamped();
        self
    }

    /// Build the ServiceContext.
    ///
    /// Record store ports are required. The in-flight guard defaults to a
    /// process-local one, the hub to an unrelayed hub, weights to the
    /// published defaults. Must run inside a Tokio runtime when no
    /// side-effect runner was supplied.
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            target_repo: self.target_repo.ok_or_else(|| required("target_repo"))?,
            reaction_repo: self.reaction_repo.ok_or_else(|| required("reaction_repo"))?,
            bookmark_repo: self.bookmark_repo.ok_or_else(|| required("bookmark_repo"))?,
            poll_repo: self.poll_repo.ok_or_else(|| required("poll_repo"))?,
            notification_repo: self
                .notification_repo
                .ok_or_else(|| required("notification_repo"))?,
            batch_repo: self.batch_repo.ok_or_else(|| required("batch_repo"))?,
            activity_repo: self.activity_repo.ok_or_else(|| required("activity_repo"))?,
            contribution_repo: self
                .contribution_repo
                .ok_or_else(|| required("contribution_repo"))?,
            inflight: self
                .inflight
                .unwrap_or_else(|| Arc::new(LocalInFlight::new(Duration::from_secs(5)))),
            fanout: self.fanout.unwrap_or_else(|| FanoutHub::new(256)),
            side_effects: self.side_effects.unwrap_or_else(SideEffects::start),
            snowflake_generator: self
                .snowflake_generator
                .unwrap_or_else(|| Arc::new(SnowflakeGenerator::new(0))),
            scoring: Arc::new(self.scoring.unwrap_or_default()),
            batch: self.batch,
        })
    }
}

fn required(what: &str) -> ServiceError {
    ServiceError::validation(format!("{what} is required"))
}
