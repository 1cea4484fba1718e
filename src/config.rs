//! Client configuration loaded from the environment.
//!
//! A `.env` file in the working directory is honoured outside of tests.

use crate::domain::session::Role;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Everything the `qtap` binary needs to talk to the backend.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    /// `RUST_LOG`-style filter directives, already known to parse.
    pub log_filter: String,
    pub token: Option<String>,
    pub subject: String,
    pub role: Role,
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url_str = lookup("QTAP_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&api_url_str)
            .map_err(|e| ConfigError::InvalidValue("QTAP_API_URL".to_string(), e))?;

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(&log_filter)
            .map_err(|e| ConfigError::InvalidValue("RUST_LOG".to_string(), e.to_string()))?;

        let token = lookup("QTAP_TOKEN").filter(|t| !t.trim().is_empty());
        let subject = lookup("QTAP_SUBJECT").unwrap_or_else(|| "local".to_string());

        let role_str = lookup("QTAP_ROLE").unwrap_or_else(|| "user".to_string());
        let role = role_str
            .parse::<Role>()
            .map_err(|e| ConfigError::InvalidValue("QTAP_ROLE".to_string(), e))?;

        let db_path = lookup("QTAP_DB_PATH").map(PathBuf::from);

        Ok(Self {
            api_url,
            log_filter,
            token,
            subject,
            role,
            db_path,
        })
    }
}

/// Parses a base URL, forcing a trailing slash so endpoint paths join under it.
pub fn parse_api_url(raw: &str) -> Result<Url, String> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| e.to_string())
}
