//! # engage-db
//!
//! Record store layer implementing the repository ports from `engage-core`.
//!
//! ## Overview
//!
//! - Connection pool management and embedded migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - PostgreSQL repositories; each toggle, vote and batch transition is one
//!   transaction or one conditional statement
//! - [`MemoryStore`], an in-process implementation of the same ports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use engage_db::pool::{create_pool, run_migrations, DatabaseConfig, MIGRATIONS_DIR};
//! use engage_db::PgReactionRepository;
//!
//! async fn example(url: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig { url: url.to_string(), ..Default::default() };
//!     let pool = create_pool(&config).await?;
//!     run_migrations(&pool, MIGRATIONS_DIR.as_ref()).await?;
//!     let reactions = PgReactionRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{
    ContributorRecord, MemoryStore, PaperRecord, PostRecord, ReviewRecord, TicketRecord,
};
pub use pool::{create_pool, run_migrations, DatabaseConfig, PgPool, MIGRATIONS_DIR};
pub use repositories::{
    PgActivityRepository, PgBatchJobRepository, PgBookmarkRepository, PgContributionRepository,
    PgNotificationRepository, PgPollRepository, PgReactionRepository, PgTargetRepository,
};
