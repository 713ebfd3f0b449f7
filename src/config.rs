// Runtime configuration.
// Reads API endpoint, timeout and monitoring flags from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_ENVIRONMENT: &str = "development";

const ENV_API_BASE_URL: &str = "TOURDESK_API_BASE_URL";
const ENV_API_TIMEOUT_MS: &str = "TOURDESK_API_TIMEOUT_MS";
const ENV_ENABLE_ERROR_TRACKING: &str = "TOURDESK_ENABLE_ERROR_TRACKING";
const ENV_MONITORING_DSN: &str = "TOURDESK_MONITORING_DSN";
const ENV_ENVIRONMENT: &str = "TOURDESK_ENVIRONMENT";
const ENV_DEV_MODE: &str = "TOURDESK_DEV_MODE";
const ENV_TOKEN_PATH: &str = "TOURDESK_TOKEN_PATH";

/// Configuration shared by the client, the logger and the tracing setup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every endpoint path is appended to.
    pub api_base_url: String,
    /// Default per-request timeout.
    pub api_timeout: Duration,
    /// Forward error log entries to the monitoring sink.
    pub enable_error_tracking: bool,
    /// Monitoring endpoint receiving forwarded error entries.
    pub monitoring_dsn: Option<String>,
    /// Deployment environment name (development, staging, production).
    pub environment: String,
    /// Print debug/info log entries, not only warnings and errors.
    pub dev_mode: bool,
    /// User agent sent with requests and stamped on error log entries.
    pub user_agent: String,
    /// Override for the persisted token file.
    pub token_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout: DEFAULT_API_TIMEOUT,
            enable_error_tracking: false,
            monitoring_dsn: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            dev_mode: cfg!(debug_assertions),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            token_path: None,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then read the process environment.
    pub fn load() -> Result<Self> {
        // A missing .env file is the normal case outside local development.
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_timeout = match lookup(ENV_API_TIMEOUT_MS) {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("{} must be milliseconds, got {:?}", ENV_API_TIMEOUT_MS, raw))
                })?;
                Duration::from_millis(millis)
            }
            None => defaults.api_timeout,
        };

        let api_base_url = lookup(ENV_API_BASE_URL)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_base_url);

        Ok(Self {
            api_base_url,
            api_timeout,
            enable_error_tracking: lookup(ENV_ENABLE_ERROR_TRACKING)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_error_tracking),
            monitoring_dsn: lookup(ENV_MONITORING_DSN).filter(|dsn| !dsn.is_empty()),
            environment: lookup(ENV_ENVIRONMENT)
                .filter(|env| !env.is_empty())
                .unwrap_or(defaults.environment),
            dev_mode: lookup(ENV_DEV_MODE)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.dev_mode),
            user_agent: defaults.user_agent,
            token_path: lookup(ENV_TOKEN_PATH).map(PathBuf::from),
        })
    }

    /// Whether error entries should be forwarded to monitoring.
    pub fn forwards_errors(&self) -> bool {
        self.enable_error_tracking && self.monitoring_dsn.is_some()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
