//! Process-local in-flight guard

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use engage_core::traits::{InFlightGuard, InFlightToken, RepoResult};

struct Held {
    token: InFlightToken,
    since: Instant,
}

pub struct LocalInFlight {
    held: DashMap<String, Held>,
    ttl: Duration,
}

impl LocalInFlight {
    pub fn new(ttl: Duration) -> Self {
        Self {
            held: DashMap::new(),
            ttl,
        }
    }
}

#[async_trait]
impl InFlightGuard for LocalInFlight {
    async fn try_acquire(&self, key: &str) -> RepoResult<Option<InFlightToken>> {
        let now = Instant::now();
        let token = InFlightToken::new(Uuid::new_v4().to_string());
        let held = Held {
            token: token.clone(),
            since: now,
        };
        match self.held.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(held);
                Ok(Some(token))
            }
            Entry::Occupied(mut slot) if now.duration_since(slot.get().since) >= self.ttl => {
                slot.insert(held);
                Ok(Some(token))
            }
            Entry::Occupied(_) => Ok(None),
        }
    }

    async fn release(&self, key: &str, token: &InFlightToken) -> RepoResult<bool> {
        Ok(self
            .held
            .remove_if(key, |_, held| held.token == *token)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_is_refused_until_release() {
        let guard = LocalInFlight::new(Duration::from_secs(5));
        let token = guard.try_acquire("1:post:2:like").await.unwrap().unwrap();
        assert!(guard.try_acquire("1:post:2:like").await.unwrap().is_none());
        assert!(guard.try_acquire("1:post:2:love").await.unwrap().is_some());

        assert!(guard.release("1:post:2:like", &token).await.unwrap());
        assert!(guard.try_acquire("1:post:2:like").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_key_can_be_taken_over() {
        let guard = LocalInFlight::new(Duration::ZERO);
        let first = guard.try_acquire("k").await.unwrap().unwrap();
        let second = guard.try_acquire("k").await.unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_stale_holder_cannot_release_new_holder() {
        let guard = LocalInFlight::new(Duration::ZERO);
        let stale = guard.try_acquire("k").await.unwrap().unwrap();
        let current = guard.try_acquire("k").await.unwrap().unwrap();

        // the first request finishes after its key was taken over
        assert!(!guard.release("k", &stale).await.unwrap());
        assert!(guard.held.contains_key("k"));

        assert!(guard.release("k", &current).await.unwrap());
        assert!(!guard.held.contains_key("k"));
    }
}
