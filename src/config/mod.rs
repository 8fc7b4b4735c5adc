//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use crate::model::RemoteUrlMode;
use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Store domain, e.g. `my-shop.myshopify.com`.
    pub store_domain: String,
    pub access_token: SecretString,
    pub api_version: String,
    pub port: u16,
    pub max_concurrent: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub remote_urls: RemoteUrlMode,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                Error::Config(format!("required environment variable {name} is not set"))
            })
        };

        let config = Self {
            store_domain: required("STORE_DOMAIN")?,
            access_token: SecretString::from(required("ACCESS_TOKEN")?),
            api_version: lookup("API_VERSION").unwrap_or_else(|| "2024-10".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            max_concurrent: parse_or(&lookup, "MAX_CONCURRENT", 2)?,
            queue_capacity: parse_or(&lookup, "QUEUE_CAPACITY", 1024)?,
            max_attempts: parse_or(&lookup, "MAX_ATTEMPTS", 2)?,
            retry_backoff: Duration::from_millis(parse_or(&lookup, "RETRY_BACKOFF_MS", 1000)?),
            probe_timeout: Duration::from_millis(parse_or(&lookup, "PROBE_TIMEOUT_MS", 5000)?),
            request_timeout: Duration::from_millis(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_MS",
                30_000,
            )?),
            remote_urls: parse_or(&lookup, "REMOTE_URL_MODE", RemoteUrlMode::Reupload)?,
            otel_endpoint: lookup("OTEL_ENDPOINT"),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        if config.max_concurrent == 0 {
            return Err(Error::Config("MAX_CONCURRENT must be at least 1".to_string()));
        }
        if config.queue_capacity == 0 {
            return Err(Error::Config("QUEUE_CAPACITY must be at least 1".to_string()));
        }
        if config.max_attempts == 0 {
            return Err(Error::Config("MAX_ATTEMPTS must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Admin GraphQL endpoint for the configured store.
    pub fn graphql_endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store_domain, self.api_version
        )
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid value for {name} ({raw}): {e}"))),
        None => Ok(default),
    }
}
