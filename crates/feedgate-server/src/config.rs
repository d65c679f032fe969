//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8700;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/feedgate";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default scheduler tick interval in seconds.
pub const DEFAULT_SCHEDULER_TICK_SECS: u64 = 60;

/// Default delay before the first scheduler tick, giving the server time
/// to finish starting up.
pub const DEFAULT_SCHEDULER_STARTUP_DELAY_SECS: u64 = 5;

/// Default per-request fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default fetch attempt count for transient failures.
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit for fetch retries in milliseconds.
pub const DEFAULT_FETCH_BACKOFF_MS: u64 = 1000;

/// Default timeout for the catalog write performed during sync, in seconds.
pub const DEFAULT_SYNC_WRITE_TIMEOUT_SECS: u64 = 10;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub fetch: FetchSettings,
    pub sync: SyncSettings,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub tick_interval_secs: u64,
    pub startup_delay_secs: u64,
}

/// Fetcher tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

/// Catalog sync tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub write_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("FEEDGATE_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_parse("FEEDGATE_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "FEEDGATE_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                connect_timeout_secs: env_parse(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            scheduler: SchedulerConfig {
                enabled: env_parse("SCHEDULER_ENABLED", true),
                tick_interval_secs: env_parse("SCHEDULER_TICK_INTERVAL", DEFAULT_SCHEDULER_TICK_SECS),
                startup_delay_secs: env_parse(
                    "SCHEDULER_STARTUP_DELAY",
                    DEFAULT_SCHEDULER_STARTUP_DELAY_SECS,
                ),
            },
            fetch: FetchSettings {
                timeout_secs: env_parse("FETCH_TIMEOUT", DEFAULT_FETCH_TIMEOUT_SECS),
                max_attempts: env_parse("FETCH_MAX_ATTEMPTS", DEFAULT_FETCH_MAX_ATTEMPTS),
                backoff_ms: env_parse("FETCH_BACKOFF_MS", DEFAULT_FETCH_BACKOFF_MS),
            },
            sync: SyncSettings {
                write_timeout_secs: env_parse(
                    "SYNC_WRITE_TIMEOUT",
                    DEFAULT_SYNC_WRITE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.fetch.max_attempts == 0 {
            anyhow::bail!("Fetch max_attempts must be greater than 0");
        }

        if self.scheduler.tick_interval_secs == 0 {
            anyhow::bail!("Scheduler tick interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                tick_interval_secs: DEFAULT_SCHEDULER_TICK_SECS,
                startup_delay_secs: DEFAULT_SCHEDULER_STARTUP_DELAY_SECS,
            },
            fetch: FetchSettings {
                timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
                max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
                backoff_ms: DEFAULT_FETCH_BACKOFF_MS,
            },
            sync: SyncSettings {
                write_timeout_secs: DEFAULT_SYNC_WRITE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_fetch_attempts_is_rejected() {
        let mut config = Config::default();
        config.fetch.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
