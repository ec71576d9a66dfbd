/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration and
 * the optional PostgreSQL connection.
 *
 * # Configuration Sources
 *
 * Configuration is loaded from environment variables (after `.env` has been
 * applied by the binary):
 *
 * - `SERVER_PORT` - listen port, default 3000
 * - `DATABASE_URL` - PostgreSQL URL; absent means the in-memory feed store
 * - `REDIS_URL` - Redis URL; absent means the in-process memory bus
 * - `FEED_DEFAULT_LIMIT` - per-source cap used when a request gives none
 *
 * # Error Handling
 *
 * A malformed value is a `ConfigError` and stops startup. A backing service
 * that is configured but unreachable is logged and replaced by its
 * in-process counterpart, so the server still comes up.
 */

use sqlx::PgPool;
use thiserror::Error;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Invalid configuration value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    /// Per-source cap when a feed request has no `limit`
    pub feed_default_limit: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            redis_url: None,
            feed_default_limit: None,
        }
    }
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("SERVER_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "SERVER_PORT",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let feed_default_limit = match non_empty("FEED_DEFAULT_LIMIT") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "FEED_DEFAULT_LIMIT",
                        value,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(limit) => Some(limit),
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: "FEED_DEFAULT_LIMIT",
                        value,
                        reason: e.to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            port,
            database_url: non_empty("DATABASE_URL"),
            redis_url: non_empty("REDIS_URL"),
            feed_default_limit,
        })
    }

    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for [`ServerConfig`], mostly for tests
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    pub fn feed_default_limit(mut self, limit: usize) -> Self {
        self.config.feed_default_limit = Some(limit);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Connect to PostgreSQL and run migrations
///
/// # Returns
///
/// - `Some(PgPool)` if the database is reachable
/// - `None` if the connection fails
///
/// Migration failures are logged; the pool is still returned since the
/// schema may already be current.
pub async fn load_database(database_url: &str) -> Option<PgPool> {
    tracing::info!("Connecting to database...");

    let pool = match PgPool::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Falling back to the in-memory feed store.");
            return None;
        }
    };

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => {
            tracing::info!("Database migrations completed successfully");
        }
        Err(e) => {
            tracing::error!("Failed to run database migrations: {}", e);
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }

    Some(pool)
}
