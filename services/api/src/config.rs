//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
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
    pub log_level: Level,
    /// Secret used to sign session tokens. Required.
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    /// Optional override for OpenAI-compatible deployments behind a
    /// different base URL (the original deployment used an Azure endpoint).
    pub openai_api_base: Option<String>,
    pub chat_model: String,
    /// Upper bound on a single completion provider call.
    pub provider_timeout_secs: u64,
    /// Origin allowed to call the API with credentials.
    pub frontend_origin: String,
    /// Production-like deployments get `Secure; SameSite=None` cookies.
    pub production: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://support_chat.db?mode=rwc".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Auth Settings ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        // --- Completion Provider Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE").ok();
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let timeout_str =
            std::env::var("PROVIDER_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let provider_timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "PROVIDER_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", timeout_str),
            )
        })?;

        // --- Deployment Settings ---
        let frontend_origin = std::env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());
        let production = std::env::var("ENVIRONMENT")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            openai_api_key,
            openai_api_base,
            chat_model,
            provider_timeout_secs,
            frontend_origin,
            production,
        })
    }
}
