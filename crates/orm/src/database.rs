//! Database configuration
//!
//! [`DatabaseConfig`] carries the connection URL and the pool settings used by
//! [`crate::backends::PostgresDriver::connect`]. It can be built in code or
//! read from the environment:
//!
//! | variable                     | default |
//! |------------------------------|---------|
//! | `DATABASE_URL`               | required |
//! | `DATABASE_MAX_CONNECTIONS`   | 10 |
//! | `DATABASE_MIN_CONNECTIONS`   | 1 |
//! | `DATABASE_ACQUIRE_TIMEOUT`   | 30 (seconds) |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;

use crate::error::{ModelError, ModelResult};

/// Connection pool configuration; missing keys take their defaults when deserialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub idle_timeout: Option<u64>,
    pub max_lifetime: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: 30,
            idle_timeout: Some(600), // 10 minutes
            max_lifetime: Some(1800), // 30 minutes
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    pub(crate) fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout))
            .test_before_acquire(self.test_before_acquire);

        if let Some(idle_timeout) = self.idle_timeout {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }
        if let Some(max_lifetime) = self.max_lifetime {
            options = options.max_lifetime(Duration::from_secs(max_lifetime));
        }
        options
    }
}

/// Parts of a database URL that are safe to log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Parse and check a PostgreSQL connection URL
pub fn parse_database_url(url: &str) -> ModelResult<ConnectionInfo> {
    let parsed = url::Url::parse(url)
        .map_err(|e| ModelError::Configuration(format!("Invalid database URL: {}", e)))?;

    if !matches!(parsed.scheme(), "postgres" | "postgresql") {
        return Err(ModelError::Configuration(format!(
            "Unsupported database URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| ModelError::Configuration("Missing host in database URL".to_string()))?
        .to_string();

    let database = parsed.path().trim_start_matches('/').to_string();
    if database.is_empty() {
        return Err(ModelError::Configuration(
            "Missing database name in URL".to_string(),
        ));
    }

    let username = if parsed.username().is_empty() {
        None
    } else {
        Some(parsed.username().to_string())
    };

    Ok(ConnectionInfo {
        host,
        port: parsed.port().unwrap_or(5432),
        database,
        username,
    })
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    database_url: String,
    pool: PoolConfig,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            pool: PoolConfig::default(),
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> ModelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ModelError::Configuration("DATABASE_URL is not set".to_string()))?;

        let mut config = Self::new(database_url);
        if let Some(max) = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            config.pool.max_connections = max;
        }
        if let Some(min) = parse_var(&lookup, "DATABASE_MIN_CONNECTIONS")? {
            config.pool.min_connections = min;
        }
        if let Some(timeout) = parse_var(&lookup, "DATABASE_ACQUIRE_TIMEOUT")? {
            config.pool.acquire_timeout = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_config(mut self, config: PoolConfig) -> Self {
        self.pool = config;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.pool.max_connections = max_connections;
        self
    }

    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.pool.min_connections = min_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout_seconds: u64) -> Self {
        self.pool.acquire_timeout = timeout_seconds;
        self
    }

    pub fn with_idle_timeout(mut self, timeout_seconds: Option<u64>) -> Self {
        self.pool.idle_timeout = timeout_seconds;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime_seconds: Option<u64>) -> Self {
        self.pool.max_lifetime = lifetime_seconds;
        self
    }

    pub fn with_test_before_acquire(mut self, enabled: bool) -> Self {
        self.pool.test_before_acquire = enabled;
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    /// Check the URL and pool bounds, returning the loggable URL parts
    pub fn validate(&self) -> ModelResult<ConnectionInfo> {
        let info = parse_database_url(&self.database_url)?;
        if self.pool.max_connections == 0 {
            return Err(ModelError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(ModelError::Configuration(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        Ok(info)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> ModelResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ModelError::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
    }
}
