//! Configuration loaded from the environment.

use std::env;

use crate::auth::MAX_SESSION_TTL_MINUTES;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    /// Enables split-sum and membership checks on expenses.
    pub strict_expense_validation: bool,
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mongodb_uri =
            env::var("MONGODB_URI").map_err(|_| ConfigError::MissingEnv("MONGODB_URI"))?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingEnv("JWT_SECRET"))?;

        let database_name = env::var("DATABASE_NAME").unwrap_or_else(|_| "mySplit".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let session_ttl_minutes = parse_session_ttl(
            &env::var("SESSION_TTL_MINUTES").unwrap_or_else(|_| "60".to_string()),
        )?;

        let strict_expense_validation = env::var("STRICT_EXPENSE_VALIDATION")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .map_err(|_| ConfigError::InvalidValue("STRICT_EXPENSE_VALIDATION"))?;

        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN")
            .ok()
            .filter(|origin| !origin.is_empty());

        Ok(Self {
            mongodb_uri,
            database_name,
            host,
            port,
            jwt_secret,
            session_ttl_minutes,
            strict_expense_validation,
            cors_allowed_origin,
        })
    }
}

/// Accepts whole minutes in `1..=MAX_SESSION_TTL_MINUTES`.
fn parse_session_ttl(raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| (1..=MAX_SESSION_TTL_MINUTES).contains(minutes))
        .ok_or(ConfigError::InvalidValue("SESSION_TTL_MINUTES"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
