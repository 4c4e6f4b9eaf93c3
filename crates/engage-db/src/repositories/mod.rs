//! PostgreSQL repository implementations

mod activity;
mod batch_job;
mod bookmark;
mod contribution;
pub mod error;
mod notification;
mod poll;
mod reaction;
mod target;

pub use activity::PgActivityRepository;
pub use batch_job::PgBatchJobRepository;
pub use bookmark::PgBookmarkRepository;
pub use contribution::PgContributionRepository;
pub use notification::PgNotificationRepository;
pub use poll::PgPollRepository;
pub use reaction::PgReactionRepository;
pub use target::PgTargetRepository;
