//! services/portal/src/config.rs
//!
//! Defines the portal's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The protected root administrator and the seed used on an empty store.
#[derive(Clone, Debug)]
pub struct RootAccount {
    pub login_id: String,
    pub department: String,
    /// Only needed to seed an empty account store.
    pub secret: Option<String>,
}

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub log_level: Level,
    pub root: RootAccount,
    pub intake_concurrency: usize,
    pub hash_cost: HashCost,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://docuhub.db".to_string(),
            max_connections: 5,
            log_level: Level::INFO,
            root: RootAccount {
                login_id: "admin".to_string(),
                department: "IT".to_string(),
                secret: None,
            },
            intake_concurrency: 4,
            hash_cost: HashCost {
                memory_kib: 19 * 1024,
                iterations: 2,
            },
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from any variable source, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Storage ---
        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);
        let max_connections =
            parse_var(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "DB_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Root administrator ---
        let root = RootAccount {
            login_id: lookup("ROOT_LOGIN_ID").unwrap_or(defaults.root.login_id),
            department: lookup("ROOT_DEPARTMENT").unwrap_or(defaults.root.department),
            secret: lookup("ROOT_SECRET"),
        };
        if root.login_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ROOT_LOGIN_ID".to_string(),
                "must not be blank".to_string(),
            ));
        }

        // --- Intake and hashing ---
        let intake_concurrency =
            parse_var(&lookup, "INTAKE_CONCURRENCY", defaults.intake_concurrency)?;
        if intake_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "INTAKE_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let hash_cost = HashCost {
            memory_kib: parse_var(&lookup, "HASH_MEMORY_KIB", defaults.hash_cost.memory_kib)?,
            iterations: parse_var(&lookup, "HASH_ITERATIONS", defaults.hash_cost.iterations)?,
        };

        Ok(Self {
            database_url,
            max_connections,
            log_level,
            root,
            intake_concurrency,
            hash_cost,
        })
    }

    pub fn is_in_memory_database(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}
