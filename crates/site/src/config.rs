//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SITE_DATABASE_URL` - `PostgreSQL` connection string. When unset (and no
//!   `DATABASE_URL` fallback exists) every collection runs on the in-memory
//!   backend and sign-in is unavailable.
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SITE_STATE_FILE` - Persistent key-value file used by the CLI
//!   (default: `.chapter/state.json`)
//! - `SITE_SESSION_TTL_HOURS` - Lifetime of sign-in sessions (default: 336)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_STATE_FILE: &str = ".chapter/state.json";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` connection URL (contains password); `None` selects the in-memory backend
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Location of the persistent key-value file
    pub state_file: PathBuf,
    /// How long a sign-in session stays valid
    pub session_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("SITE_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty())
            .map(SecretString::from);

        let host = lookup("SITE_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_HOST".to_owned(), e.to_string()))?;
        let port = lookup("SITE_PORT")
            .unwrap_or_else(|| "3000".to_owned())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_PORT".to_owned(), e.to_string()))?;
        let state_file = lookup("SITE_STATE_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);

        let ttl_hours = match lookup("SITE_SESSION_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "SITE_SESSION_TTL_HOURS".to_owned(),
                        format!("expected a positive number of hours, got '{raw}'"),
                    )
                })?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        Ok(Self {
            database_url,
            host,
            port,
            state_file,
            session_ttl: Duration::hours(ttl_hours),
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<SiteConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        SiteConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_select_in_memory_backend() {
        let config = config_from(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.state_file, PathBuf::from(".chapter/state.json"));
        assert_eq!(config.session_ttl, Duration::hours(336));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/site")]).unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://localhost/site"
        );

        let config = config_from(&[
            ("SITE_DATABASE_URL", "postgres://primary/site"),
            ("DATABASE_URL", "postgres://fallback/site"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://primary/site"
        );
    }

    #[test]
    fn test_blank_database_url_is_absent() {
        let config = config_from(&[("SITE_DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("SITE_PORT", "http")]),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "SITE_PORT"
        ));
        assert!(config_from(&[("SITE_HOST", "not-an-ip")]).is_err());
        assert!(config_from(&[("SITE_SESSION_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = config_from(&[("SITE_DATABASE_URL", "postgres://u:hunter2@db/site")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
