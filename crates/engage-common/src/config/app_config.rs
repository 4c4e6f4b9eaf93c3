//! Application configuration
//!
//! Loaded from environment variables (after an optional `.env` file). Scoring
//! weights may additionally come from a TOML file named by
//! `ENGAGE_SCORING_FILE`, with `SCORING_*` variables taking precedence.

use engage_core::ScoringWeights;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    /// Required when the store backend is Postgres
    pub database: Option<DatabaseConfig>,
    /// Enables the Redis in-flight guard and cross-instance fan-out relay
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub engine: EngineConfig,
    pub scoring: ScoringWeights,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Identity tokens are issued by the portal's auth provider; the engine
/// only validates them
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue("STORE_BACKEND", other.to_string())),
        }
    }
}

/// Knobs of the engagement engine itself
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store_backend: StoreBackend,
    #[serde(default)]
    pub worker_id: u16,
    /// Queue depth per realtime subscriber; a full queue drops the subscriber
    #[serde(default = "default_fanout_buffer")]
    pub fanout_buffer: usize,
    #[serde(default)]
    pub fanout_relay: bool,
    #[serde(default = "default_batch_poll_interval")]
    pub batch_poll_interval_secs: u64,
    #[serde(default = "default_batch_jobs_per_tick")]
    pub batch_jobs_per_tick: i64,
    #[serde(default = "default_batch_progress_every")]
    pub batch_progress_every: usize,
    #[serde(default = "default_inflight_ttl_ms")]
    pub inflight_ttl_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::default(),
            worker_id: 0,
            fanout_buffer: default_fanout_buffer(),
            fanout_relay: false,
            batch_poll_interval_secs: default_batch_poll_interval(),
            batch_jobs_per_tick: default_batch_jobs_per_tick(),
            batch_progress_every: default_batch_progress_every(),
            inflight_ttl_ms: default_inflight_ttl_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "engage-engine".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

fn default_fanout_buffer() -> usize {
    256
}

fn default_batch_poll_interval() -> u64 {
    30
}

fn default_batch_jobs_per_tick() -> i64 {
    5
}

fn default_batch_progress_every() -> usize {
    10
}

fn default_inflight_ttl_ms() -> u64 {
    5000
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

fn flag_var(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
        Err(_) => Ok(false),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let engine = EngineConfig {
            store_backend: parse_var("STORE_BACKEND", StoreBackend::default)?,
            worker_id: parse_var("WORKER_ID", || 0)?,
            fanout_buffer: parse_var("FANOUT_BUFFER", default_fanout_buffer)?,
            fanout_relay: flag_var("FANOUT_RELAY_ENABLED")?,
            batch_poll_interval_secs: parse_var(
                "BATCH_POLL_INTERVAL_SECS",
                default_batch_poll_interval,
            )?,
            batch_jobs_per_tick: parse_var("BATCH_JOBS_PER_TICK", default_batch_jobs_per_tick)?,
            batch_progress_every: parse_var(
                "BATCH_PROGRESS_EVERY",
                default_batch_progress_every,
            )?,
            inflight_ttl_ms: parse_var("INFLIGHT_TTL_MS", default_inflight_ttl_ms)?,
        };

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
            }),
            Err(_) if engine.store_backend == StoreBackend::Postgres => {
                return Err(ConfigError::MissingVar("DATABASE_URL"))
            }
            Err(_) => None,
        };

        let redis = match env::var("REDIS_URL") {
            Ok(url) => Some(RedisConfig {
                url,
                max_connections: parse_var(
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections,
                )?,
            }),
            Err(_) if engine.fanout_relay => return Err(ConfigError::MissingVar("REDIS_URL")),
            Err(_) => None,
        };

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: parse_var("APP_ENV", Environment::default)?,
            },
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| default_host()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(ConfigError::MissingVar("PORT"))?,
                request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", default_request_timeout)?,
            },
            database,
            redis,
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?,
                issuer: env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: parse_var(
                    "RATE_LIMIT_RPS",
                    default_requests_per_second,
                )?,
                burst: parse_var("RATE_LIMIT_BURST", default_burst)?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            engine,
            scoring: load_scoring_weights(env::var("ENGAGE_SCORING_FILE").ok().as_deref())?,
        })
    }

    /// Development configuration on the in-memory store with no relay.
    /// Port 0 binds an ephemeral port.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::Development,
            },
            server: ServerConfig {
                host: default_host(),
                port: 0,
                request_timeout_secs: default_request_timeout(),
            },
            database: None,
            redis: None,
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                issuer: None,
            },
            rate_limit: RateLimitConfig {
                requests_per_second: 1000,
                burst: 1000,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
            },
            engine: EngineConfig {
                store_backend: StoreBackend::Memory,
                ..EngineConfig::default()
            },
            scoring: ScoringWeights::default(),
        }
    }
}

/// Layer an optional TOML file and `SCORING_*` variables over the default weights
///
/// # Errors
/// Returns an error if the file is unreadable or a value has the wrong type
pub fn load_scoring_weights(file: Option<&str>) -> Result<ScoringWeights, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(config::File::with_name(path).required(true));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("SCORING")
            .prefix_separator("_")
            .try_parsing(true),
    );

    Ok(builder.build()?.try_deserialize()?)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!("Production".parse::<Environment>().unwrap(), Environment::Production);
        assert!(Environment::Production.is_production());
        assert!(!Environment::Staging.is_development());
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("POSTGRES".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.fanout_buffer, 256);
        assert_eq!(engine.batch_jobs_per_tick, 5);
        assert_eq!(engine.batch_progress_every, 10);
        assert_eq!(engine.store_backend, StoreBackend::Postgres);
    }

    #[test]
    fn test_in_memory_config() {
        let config = AppConfig::in_memory("dev-secret");
        assert_eq!(config.engine.store_backend, StoreBackend::Memory);
        assert!(config.database.is_none());
        assert!(config.redis.is_none());
        assert!(config.server.address().ends_with(":0"));
        assert_eq!(config.jwt.secret, "dev-secret");
        assert!(!config.engine.fanout_relay);
    }

    #[test]
    fn test_scoring_weights_from_file() {
        let dir = env::temp_dir().join(format!("engage-scoring-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scoring.toml");
        std::fs::write(&path, "paper_upload = 80\nticket_resolved = 45\n").unwrap();

        let weights = load_scoring_weights(path.to_str()).unwrap();
        assert_eq!(weights.paper_upload, 80);
        assert_eq!(weights.ticket_resolved, 45);
        // untouched keys keep their defaults
        assert_eq!(weights.review, 25);

        std::fs::remove_dir_all(&dir).ok();
    }
}
