//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig, EngineConfig, Environment,
    JwtConfig, RateLimitConfig, RedisConfig, ServerConfig, StoreBackend,
    load_scoring_weights,
};
