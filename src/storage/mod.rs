//! PostgreSQL persistence for channels, jobs, imports and metrics
//!
//! Every write is an upsert by id, so a row always reflects its own last
//! successful write. No cross-row transactions are used.

pub mod postgres;
pub mod repository;

use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use thiserror::Error;
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::config::DatabaseConfig;

pub use postgres::{PgChannelRepository, PgImportRepository, PgJobRepository};
pub use repository::{
    ChannelRepository, ImportRepository, JobRepository, MockChannelRepository,
    MockImportRepository, MockJobRepository,
};

/// Errors raised by repositories
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not obtain a pooled connection
    #[error("failed to get database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Query failed
    #[error("failed to {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Row does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Stored value could not be mapped back to a model
    #[error("invalid {column} value in database: {value}")]
    Decode { column: &'static str, value: String },

    /// Backend refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(tokio_postgres::Error) -> Self {
        move |source| Self::Query { operation, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS channels (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        integration TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    );

    CREATE TABLE IF NOT EXISTS jobs (
        id UUID PRIMARY KEY,
        channel_id UUID NOT NULL REFERENCES channels(id),
        status TEXT NOT NULL,
        publish_status TEXT NOT NULL,
        url TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        source TEXT NOT NULL,
        location TEXT NOT NULL,
        remote BOOLEAN NOT NULL,
        posted_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_channel_id ON jobs(channel_id);

    CREATE INDEX IF NOT EXISTS idx_jobs_publishable
        ON jobs(channel_id, status, publish_status);

    CREATE TABLE IF NOT EXISTS imports (
        id UUID PRIMARY KEY,
        channel_id UUID NOT NULL REFERENCES channels(id),
        status TEXT NOT NULL,
        started_at TIMESTAMPTZ NOT NULL,
        ended_at TIMESTAMPTZ,
        error TEXT
    );

    CREATE TABLE IF NOT EXISTS import_metrics (
        id UUID PRIMARY KEY,
        import_id UUID NOT NULL REFERENCES imports(id),
        job_id UUID NOT NULL,
        metric_type TEXT NOT NULL,
        error TEXT,
        created_at TIMESTAMPTZ NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_import_metrics_import_id ON import_metrics(import_id);
"#;

/// Database management wrapper
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Create the PostgreSQL connection pool
    pub fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let mut cfg = PoolConfig::new();
        cfg.url = Some(config.url.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create PostgreSQL connection pool: {e}"))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist
    pub async fn init_schema(&self) -> StorageResult<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(SCHEMA)
            .await
            .map_err(StorageError::query("create schema"))?;

        tracing::info!("database schema initialized");
        Ok(())
    }

    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }
}
