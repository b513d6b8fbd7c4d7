//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub cors_allowed_origins: Vec<String>,
    pub openai_api_key: String,
    pub suggestion_model: String,
    pub llm_timeout: Duration,
    pub llm_retry_backoff: Duration,
    pub crf_model_path: PathBuf,
    pub max_text_chars: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address = parse("BIND_ADDRESS", &or_default("BIND_ADDRESS", "0.0.0.0:8000"))?;
        let database_url = required("DATABASE_URL")?;
        let db_max_connections = parse("DB_MAX_CONNECTIONS", &or_default("DB_MAX_CONNECTIONS", "5"))?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Security Settings ---
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_ttl_hours: i64 = parse("JWT_TTL_HOURS", &or_default("JWT_TTL_HOURS", "168"))?;
        if jwt_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "JWT_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let cors_allowed_origins: Vec<String> = required("CORS_ALLOWED_ORIGINS")?
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        if cors_allowed_origins.is_empty() {
            return Err(ConfigError::MissingVar("CORS_ALLOWED_ORIGINS".to_string()));
        }

        // --- Analysis Pipeline Settings ---
        let openai_api_key = required("OPENAI_API_KEY")?;
        let suggestion_model = or_default("SUGGESTION_MODEL", "gpt-4o-mini");
        let llm_timeout_secs: u64 = parse("LLM_TIMEOUT_SECS", &or_default("LLM_TIMEOUT_SECS", "30"))?;
        let llm_retry_backoff_ms: u64 =
            parse("LLM_RETRY_BACKOFF_MS", &or_default("LLM_RETRY_BACKOFF_MS", "500"))?;
        let crf_model_path = PathBuf::from(or_default("CRF_MODEL_PATH", "./models/crf_model.json"));
        let max_text_chars = parse("MAX_TEXT_CHARS", &or_default("MAX_TEXT_CHARS", "10000"))?;

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            jwt_secret,
            jwt_ttl: chrono::Duration::hours(jwt_ttl_hours),
            cors_allowed_origins,
            openai_api_key,
            suggestion_model,
            llm_timeout: Duration::from_secs(llm_timeout_secs),
            llm_retry_backoff: Duration::from_millis(llm_retry_backoff_ms),
            crf_model_path,
            max_text_chars,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
