//! Configuration management for jobsync
//!
//! Settings come from environment variables or a TOML file and are
//! validated before any component is built from them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Import run configuration
    pub import: ImportConfig,

    /// Upstream job board configuration
    pub gateway: GatewayConfig,

    /// Command/event queue configuration
    pub queue: QueueConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,

    /// Maximum pool size
    pub pool_size: usize,
}

/// Worker pool sizing for one import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Job save workers used during reconciliation
    pub job_workers: usize,

    /// Capacity of the job save queue
    pub job_buffer: usize,

    /// Metric writer workers
    pub metric_workers: usize,

    /// Capacity of the decision queue
    pub metric_buffer: usize,

    /// Publish "job missing" events for jobs that disappeared upstream
    pub announce_missing: bool,
}

/// Upstream job board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Arbeitnow base URL
    pub arbeitnow_url: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

/// Redis-backed queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub redis_url: String,

    /// Key prefix for namespacing
    pub key_prefix: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Deadline for a single publish call, in seconds
    pub publish_timeout_secs: u64,

    /// Blocking pop timeout for the worker loop, in seconds
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the push endpoint listens on
    pub bind_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database_url = std::env::var("JOBSYNC_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or(defaults.database.url);

        let redis_url = std::env::var("JOBSYNC_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .unwrap_or(defaults.queue.redis_url);

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                pool_size: env_parse("JOBSYNC_DATABASE_POOL_SIZE", defaults.database.pool_size),
            },
            import: ImportConfig {
                job_workers: env_parse("JOBSYNC_JOB_WORKERS", defaults.import.job_workers),
                job_buffer: env_parse("JOBSYNC_JOB_BUFFER", defaults.import.job_buffer),
                metric_workers: env_parse("JOBSYNC_METRIC_WORKERS", defaults.import.metric_workers),
                metric_buffer: env_parse("JOBSYNC_METRIC_BUFFER", defaults.import.metric_buffer),
                announce_missing: env_parse(
                    "JOBSYNC_ANNOUNCE_MISSING",
                    defaults.import.announce_missing,
                ),
            },
            gateway: GatewayConfig {
                arbeitnow_url: env_string("JOBSYNC_ARBEITNOW_URL", &defaults.gateway.arbeitnow_url),
                request_timeout_secs: env_parse(
                    "JOBSYNC_REQUEST_TIMEOUT",
                    defaults.gateway.request_timeout_secs,
                ),
                user_agent: env_string("JOBSYNC_USER_AGENT", &defaults.gateway.user_agent),
            },
            queue: QueueConfig {
                redis_url,
                key_prefix: env_string("JOBSYNC_QUEUE_PREFIX", &defaults.queue.key_prefix),
                pool_size: env_parse("JOBSYNC_REDIS_POOL_SIZE", defaults.queue.pool_size),
                publish_timeout_secs: env_parse(
                    "JOBSYNC_PUBLISH_TIMEOUT",
                    defaults.queue.publish_timeout_secs,
                ),
                poll_timeout_secs: env_parse(
                    "JOBSYNC_POLL_TIMEOUT",
                    defaults.queue.poll_timeout_secs,
                ),
            },
            server: ServerConfig {
                bind_address: env_string("JOBSYNC_BIND_ADDRESS", &defaults.server.bind_address),
            },
            logging: LoggingConfig {
                level: env_string("JOBSYNC_LOG_LEVEL", &defaults.logging.level),
                format: env_string("JOBSYNC_LOG_FORMAT", &defaults.logging.format),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }

        if self.import.job_workers == 0 || self.import.metric_workers == 0 {
            anyhow::bail!("import worker counts must be greater than 0");
        }

        if self.import.job_buffer == 0 || self.import.metric_buffer == 0 {
            anyhow::bail!("import queue capacities must be greater than 0");
        }

        if self.queue.pool_size == 0 {
            anyhow::bail!("queue.pool_size must be greater than 0");
        }

        url::Url::parse(&self.gateway.arbeitnow_url)
            .with_context(|| format!("Invalid gateway.arbeitnow_url: {}", self.gateway.arbeitnow_url))?;
        url::Url::parse(&self.queue.redis_url)
            .with_context(|| format!("Invalid queue.redis_url: {}", self.queue.redis_url))?;

        self.bind_address()?;

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.request_timeout_secs)
    }

    /// Get publish deadline as Duration
    #[must_use]
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.queue.publish_timeout_secs)
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .with_context(|| format!("Invalid server.bind_address: {}", self.server.bind_address))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: String::from("postgresql://localhost/jobsync"),
                pool_size: 10,
            },
            import: ImportConfig {
                job_workers: 4,
                job_buffer: 100,
                metric_workers: 4,
                metric_buffer: 100,
                announce_missing: true,
            },
            gateway: GatewayConfig {
                arbeitnow_url: String::from("https://www.arbeitnow.com"),
                request_timeout_secs: 30,
                user_agent: format!("jobsync/{}", env!("CARGO_PKG_VERSION")),
            },
            queue: QueueConfig {
                redis_url: String::from("redis://localhost:6379"),
                key_prefix: String::from("jobsync"),
                pool_size: 10,
                publish_timeout_secs: 5,
                poll_timeout_secs: 5,
            },
            server: ServerConfig {
                bind_address: String::from("0.0.0.0:8080"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
