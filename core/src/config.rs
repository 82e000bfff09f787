//! Client configuration.
//!
//! Defaults match the service's local development setup. `from_env` reads a
//! `.env` file when present, then `PRICEWATCH_API_URL` and
//! `PRICEWATCH_TIMEOUT_MS`.

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

pub const API_URL_VAR: &str = "PRICEWATCH_API_URL";
pub const TIMEOUT_VAR: &str = "PRICEWATCH_TIMEOUT_MS";

/// Validated settings for a `PriceClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ClientConfig {
    /// Parse `base_url` and use the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(None, None)
    }

    /// Like `from_env`, but `api_url` and `timeout_ms` win over the
    /// environment when given. Only the winning values are validated.
    pub fn from_env_with(
        api_url: Option<&str>,
        timeout_ms: Option<&str>,
    ) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env_url = env::var(API_URL_VAR).ok();
        let env_timeout = env::var(TIMEOUT_VAR).ok();
        Self::from_parts(
            api_url.or(env_url.as_deref()),
            timeout_ms.or(env_timeout.as_deref()),
        )
    }

    /// Validate raw settings, filling in defaults for the missing ones.
    pub fn from_parts(base_url: Option<&str>, timeout_ms: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::new(base_url.unwrap_or(DEFAULT_BASE_URL))?;
        if let Some(raw) = timeout_ms {
            config.timeout = parse_timeout_ms(raw)?;
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    Ok(url)
}

/// Parse a positive millisecond count.
pub fn parse_timeout_ms(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}
