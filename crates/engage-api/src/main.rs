//! Engagement engine API server
//!
//! Run with:
//! ```bash
//! STORE_BACKEND=memory PORT=8080 JWT_SECRET=dev cargo run -p engage-api
//! ```
//!
//! Configuration is read from environment variables and an optional `.env`.

use engage_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // RUST_LOG may come from .env
    let _ = dotenvy::dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        address = %config.server.address(),
        store = ?config.engine.store_backend,
        relay = config.engine.fanout_relay,
        "Starting engagement engine"
    );

    if let Err(e) = engage_api::run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
