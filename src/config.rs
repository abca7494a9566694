use std::{collections::HashMap, env, fmt::Display, str::FromStr};

use thiserror::Error;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_SESSION_HOURS};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub page_size: i64,
    pub db_max_connections: u32,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so it can be fed a fixed map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            port: try_load(&lookup, "RUST_PORT", "8000")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            session_hours: try_load(&lookup, "SESSION_HOURS", "24")?,
            page_size: try_load(&lookup, "PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())?,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "5")?,
        };

        if !(1..=MAX_SESSION_HOURS).contains(&config.session_hours) {
            return Err(ConfigError::Invalid {
                key: "SESSION_HOURS",
                reason: format!("must be between 1 and {MAX_SESSION_HOURS}"),
            });
        }
        if config.page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                reason: String::from("must be at least 1"),
            });
        }

        Ok(config)
    }

    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            log::warn!("Environment variable {key} not found");
            Err(ConfigError::Missing(key))
        }
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| {
            log::warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}
