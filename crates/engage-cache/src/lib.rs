//! # engage-cache
//!
//! Realtime fan-out and short-lived coordination state.
//!
//! ## Features
//!
//! - **Fan-out hub**: scope-filtered change-event streams for local subscribers
//! - **Relay**: Redis pub/sub bridge so subscribers on every instance see every event
//! - **In-flight guards**: reject a duplicate toggle while the first is still running
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//!
//! ## Example
//!
//! ```ignore
//! use engage_cache::{FanoutHub, RedisPool, RedisPoolConfig, RelayPublisher};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let hub = FanoutHub::new(256).with_relay(RelayPublisher::new(pool, instance_id));
//!
//! let mut events = hub.subscribe(ScopeFilter::new(Some("north".into()), None, None));
//! hub.publish(change).await?;
//! ```

pub mod fanout;
pub mod inflight;
pub mod pool;

pub use fanout::{
    spawn_relay_listener, FanoutError, FanoutHub, RelayConfig, RelayEnvelope, RelayPublisher,
    Subscription, CHANGES_CHANNEL,
};
pub use inflight::{LocalInFlight, RedisInFlight};
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
