//! Cluster-wide in-flight guard backed by `SET NX PX`
//!
//! The stored value is the holder's token. Release goes through a Lua
//! compare-and-delete so a request that outlived its TTL cannot free a
//! key another request has since taken.

use async_trait::async_trait;
use redis::Script;
use uuid::Uuid;

use engage_core::traits::{InFlightGuard, InFlightToken, RepoResult};

use crate::pool::{RedisPool, RedisPoolError};

const KEY_PREFIX: &str = "engage:inflight:";

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

pub struct RedisInFlight {
    pool: RedisPool,
    ttl_ms: u64,
    release: Script,
}

impl RedisInFlight {
    pub fn new(pool: RedisPool, ttl_ms: u64) -> Self {
        Self {
            pool,
            ttl_ms,
            release: Script::new(RELEASE_SCRIPT),
        }
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl InFlightGuard for RedisInFlight {
    async fn try_acquire(&self, key: &str) -> RepoResult<Option<InFlightToken>> {
        let token = InFlightToken::new(Uuid::new_v4().to_string());
        let mut conn = self.pool.get().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(key))
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(self.ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(reply.map(|_| token))
    }

    async fn release(&self, key: &str, token: &InFlightToken) -> RepoResult<bool> {
        let mut conn = self.pool.get().await?;
        let deleted: i64 = self
            .release
            .key(Self::key(key))
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(deleted == 1)
    }
}
