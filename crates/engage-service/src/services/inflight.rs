//! Scoped hold on an in-flight key

use std::sync::Arc;

use engage_core::traits::{InFlightGuard, InFlightToken};
use tracing::{debug, warn};

use super::error::ServiceResult;

/// Holds one in-flight key until released or dropped.
///
/// A request cancelled between acquire and release (client gone, handler
/// future dropped) still frees its key: the drop hands the release to the
/// runtime instead of leaving the key to expire.
pub struct InFlightLease {
    guard: Arc<dyn InFlightGuard>,
    key: String,
    token: Option<InFlightToken>,
}

impl InFlightLease {
    /// `None` when another request already holds `key`
    pub async fn acquire(
        guard: Arc<dyn InFlightGuard>,
        key: impl Into<String>,
    ) -> ServiceResult<Option<Self>> {
        let key = key.into();
        let token = guard.try_acquire(&key).await?;
        Ok(token.map(|token| Self {
            guard,
            key,
            token: Some(token),
        }))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(mut self) {
        if let Some(token) = self.token.take() {
            release_logged(self.guard.as_ref(), &self.key, &token).await;
        }
    }
}

impl Drop for InFlightLease {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let guard = Arc::clone(&self.guard);
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_logged(guard.as_ref(), &key, &token).await;
                });
            }
            Err(_) => warn!(key = %key, "In-flight lease dropped outside a runtime, left to expire"),
        }
    }
}

async fn release_logged(guard: &dyn InFlightGuard, key: &str, token: &InFlightToken) {
    match guard.release(key, token).await {
        Ok(true) => {}
        Ok(false) => debug!(key, "In-flight key expired before release"),
        // the guard's TTL frees the key eventually
        Err(err) => warn!(key, error = %err, "In-flight release failed"),
    }
}
