//! deadpool-redis pool shared by the relay publisher and the in-flight guard.
//!
//! Checkouts time out quickly: a stalled Redis must surface as
//! `Unavailable` to the toggle path and the readiness probe instead of
//! holding requests open.

use std::time::Duration;

use deadpool_redis::{Config, Connection, Pool, Runtime};

use engage_common::RedisConfig;
use engage_core::error::DomainError;

#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    pub url: String,
    pub max_connections: usize,
    /// Upper bound on waiting for a free connection or opening a new one
    pub checkout_timeout: Duration,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
            checkout_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&RedisConfig> for RedisPoolConfig {
    fn from(config: &RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Redis checkout failed: {0}")]
    Checkout(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("Unexpected Redis reply: {0}")]
    UnexpectedReply(String),

    #[error("Relay payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

impl From<RedisPoolError> for DomainError {
    fn from(e: RedisPoolError) -> Self {
        match e {
            RedisPoolError::Payload(e) => DomainError::InternalError(e.to_string()),
            other => DomainError::Unavailable(other.to_string()),
        }
    }
}

/// Host part of a Redis URL, without credentials
fn redacted(url: &str) -> &str {
    url.rsplit_once('@').map_or(url, |(_, host)| host)
}

#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisPool")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

impl RedisPool {
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .wait_timeout(Some(config.checkout_timeout))
            .create_timeout(Some(config.checkout_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        tracing::info!(
            url = %redacted(&config.url),
            max_connections = config.max_connections,
            checkout_timeout_ms = config.checkout_timeout.as_millis() as u64,
            "Relay Redis pool ready"
        );

        Ok(Self { pool })
    }

    pub fn from_config(config: &RedisConfig) -> RedisResult<Self> {
        Self::new(config.into())
    }

    pub async fn get(&self) -> RedisResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// PING through a pooled connection
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(RedisPoolError::UnexpectedReply(reply))
        }
    }
}
