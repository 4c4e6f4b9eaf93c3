//! Server setup and initialization
//!
//! Builds the record store, coordination layer and service context from
//! configuration, then runs the HTTP server next to the batch worker until
//! a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use engage_cache::{
    spawn_relay_listener, FanoutHub, LocalInFlight, RedisInFlight, RedisPool, RelayConfig,
    RelayPublisher,
};
use engage_common::{AppConfig, AppError, StoreBackend};
use engage_core::SnowflakeGenerator;
use engage_db::{create_pool, run_migrations, DatabaseConfig, MemoryStore, MIGRATIONS_DIR};
use engage_service::{BatchSettings, BatchWorker, ServiceContext, ServiceContextBuilder};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::{apply_middleware, apply_rate_limit};
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config();

    // health probes bypass rate limiting
    let api = apply_rate_limit(create_router(), &config.rate_limit);
    let router = health_routes().merge(api);
    let router = apply_middleware(
        router,
        &config.server,
        &config.cors,
        config.app.env.is_production(),
    );

    router.with_state(state)
}

fn internal(context: &'static str, err: impl Into<anyhow::Error>) -> AppError {
    AppError::Internal(err.into().context(context))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let engine = &config.engine;

    let mut builder = ServiceContextBuilder::new()
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(engine.worker_id)))
        .scoring(config.scoring.clone())
        .batch_settings(BatchSettings::from(engine));

    // Record store
    let mut db_pool = None;
    match engine.store_backend {
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres store".into()))?;

            info!("Connecting to PostgreSQL...");
            let db_config = DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                min_connections: database.min_connections,
                ..Default::default()
            };
            let pool = create_pool(&db_config)
                .await
                .map_err(|e| internal("connecting to PostgreSQL", e))?;
            run_migrations(&pool, MIGRATIONS_DIR.as_ref())
                .await
                .map_err(|e| internal("applying migrations", e))?;
            info!("PostgreSQL connection established");

            builder = builder.postgres(&pool);
            db_pool = Some(pool);
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; records are lost on restart");
            builder = builder.memory(&MemoryStore::new());
        }
    }

    // Coordination: in-flight guard and fan-out
    let mut hub = FanoutHub::new(engine.fanout_buffer);
    let inflight_ttl = Duration::from_millis(engine.inflight_ttl_ms);
    let redis_pool = match &config.redis {
        Some(redis) => {
            info!("Connecting to Redis...");
            let pool = RedisPool::from_config(redis).map_err(|e| internal("creating Redis pool", e))?;
            builder = builder.inflight(Arc::new(RedisInFlight::new(pool.clone(), engine.inflight_ttl_ms)));

            if engine.fanout_relay {
                let origin = Uuid::new_v4();
                hub = hub.with_relay(RelayPublisher::new(pool.clone(), origin));
                spawn_relay_listener(
                    RelayConfig {
                        redis_url: redis.url.clone(),
                        ..RelayConfig::default()
                    },
                    origin,
                    hub.clone(),
                );
                info!(origin = %origin, "Cross-instance fan-out relay enabled");
            }
            Some(pool)
        }
        None => {
            builder = builder.inflight(Arc::new(LocalInFlight::new(inflight_ttl)));
            None
        }
    };

    let service_context = builder
        .fanout(hub)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let mut state = AppState::new(service_context, config);
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }
    if let Some(pool) = redis_pool {
        state = state.with_redis_pool(pool);
    }
    Ok(state)
}

/// Start the background batch processor; it stops when `shutdown` flips to true
pub fn spawn_batch_worker(
    context: ServiceContext,
    period: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let worker = BatchWorker::new(context);
    tokio::spawn(worker.run(period, shutdown))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the HTTP server until ctrl-c, then stop the worker and drain side effects
pub async fn run_server(state: AppState, listener: TcpListener) -> Result<(), AppError> {
    let context = state.service_context().clone();
    let period = Duration::from_secs(state.config().engine.batch_poll_interval_secs.max(1));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = spawn_batch_worker(context.clone(), period, shutdown_rx);

    let app = create_app(state);
    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on http://{}", addr);
    }

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        warn!(error = %e, "Batch worker ended abnormally");
    }
    context.side_effects().drain().await;
    info!("Server stopped");

    served.map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.server.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let state = create_app_state(config).await?;
    run_server(state, listener).await
}
