//! Server configuration loaded from environment variables.
//!
//! `.env` is read first by `main` through `dotenvy`.
//!
//! - `SECRET_KEY` - token signing secret (required)
//! - `DATABASE_URL` - SQLite url (default: `sqlite://shop_sales.db`)
//! - `HOST` - bind address (default: `0.0.0.0`)
//! - `PORT` - listen port (default: 3000)
//! - `TOKEN_TTL_SECS` - token lifetime in seconds (default: 900)

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://shop_sales.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOKEN_TTL_SECS: u64 = 15 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub token_ttl: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret_key", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests don't have
    /// to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("SECRET_KEY"))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("PORT", e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let ttl_secs = match lookup("TOKEN_TTL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar("TOKEN_TTL_SECS", e.to_string()))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TOKEN_TTL_SECS",
                "must be greater than zero".to_owned(),
            ));
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port,
            secret_key,
            token_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "s3cr3t")])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl, Duration::from_secs(900));
    }

    #[test]
    fn secret_is_required() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "8080")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnvVar("SECRET_KEY"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SECRET_KEY", "k"), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar("PORT", _)));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "hunter2")])).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
