use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PORT: &str = "1111";
pub const DEFAULT_DATABASE: &str = "kabbalah-code";
pub const DEFAULT_MAX_POOL_SIZE: &str = "10";

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Connection string of the document store. Absence is only reported when
    /// the first handler needs a connection.
    pub mongodb_uri: Option<String>,
    pub mongodb_db: String,
    pub max_pool_size: u32,
    pub admin_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self {
            port: try_load("RUST_PORT", DEFAULT_PORT)?,
            mongodb_uri: load_secret("MONGODB_URI"),
            mongodb_db: try_load("MONGODB_DB", DEFAULT_DATABASE)?,
            max_pool_size: try_load("MONGODB_MAX_POOL_SIZE", DEFAULT_MAX_POOL_SIZE)?,
            admin_token: load_secret("ADMIN_TOKEN"),
        };

        if config.mongodb_uri.is_none() {
            warn!("MONGODB_URI not set, database requests will fail");
        }
        if config.admin_token.is_none() {
            warn!("ADMIN_TOKEN not set, waitlist listing is disabled");
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            mongodb_uri: None,
            mongodb_db: DEFAULT_DATABASE.to_string(),
            max_pool_size: 10,
            admin_token: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    parse_value(key, var(key), default)
}

fn parse_value<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
        })
}

/// Environment first, then the mounted secret file of the same name.
fn load_secret(secret_name: &str) -> Option<String> {
    if let Some(value) = var(secret_name) {
        return Some(value.trim().to_string());
    }

    let path = format!("{SECRETS_DIR}/{secret_name}");
    match read_to_string(&path) {
        Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Ok(_) => {
            warn!("Secret file for {secret_name} is empty");
            None
        }
        Err(e) => {
            info!("{secret_name} not found in environment or secrets: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_falls_back_to_default() {
        let port: u16 = parse_value("RUST_PORT", None, DEFAULT_PORT).unwrap();
        assert_eq!(port, 1111);

        let db: String = parse_value("MONGODB_DB", None, DEFAULT_DATABASE).unwrap();
        assert_eq!(db, "kabbalah-code");
    }

    #[test]
    fn present_value_is_trimmed_and_parsed() {
        let size: u32 =
            parse_value("MONGODB_MAX_POOL_SIZE", Some(" 4 ".to_string()), "10").unwrap();
        assert_eq!(size, 4);
    }

    #[test]
    fn invalid_value_is_reported_with_key() {
        let err = parse_value::<u16>("RUST_PORT", Some("eighty".to_string()), DEFAULT_PORT)
            .unwrap_err();
        assert!(err.to_string().contains("RUST_PORT"));
    }
}
