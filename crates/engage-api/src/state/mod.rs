//! Application state
//!
//! Shared by every handler: the service context, the identity verifier and
//! handles the readiness probe checks.

use std::sync::Arc;

use engage_cache::RedisPool;
use engage_common::{AppConfig, IdentityVerifier};
use engage_db::PgPool;
use engage_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: Arc<ServiceContext>,
    config: Arc<AppConfig>,
    verifier: Arc<IdentityVerifier>,
    /// `None` when running on the in-memory store
    db_pool: Option<PgPool>,
    /// `None` when the cross-instance relay is off
    redis_pool: Option<RedisPool>,
}

impl AppState {
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        let verifier = IdentityVerifier::new(&config.jwt.secret, config.jwt.issuer.clone());
        Self {
            service_context: Arc::new(service_context),
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            db_pool: None,
            redis_pool: None,
        }
    }

    #[must_use]
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_redis_pool(mut self, pool: RedisPool) -> Self {
        self.redis_pool = Some(pool);
        self
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn verifier(&self) -> &IdentityVerifier {
        &self.verifier
    }

    pub fn db_pool(&self) -> Option<&PgPool> {
        self.db_pool.as_ref()
    }

    pub fn redis_pool(&self) -> Option<&RedisPool> {
        self.redis_pool.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &self.service_context)
            .field("postgres", &self.db_pool.is_some())
            .field("relay", &self.redis_pool.is_some())
            .finish_non_exhaustive()
    }
}
