//! CLI command implementations and the wiring they share

pub mod import;
pub mod migrate;
pub mod schedule;
pub mod serve;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};

use jobsync::config::Config;
use jobsync::importer::{ImportAction, ImportRunner, ImportService, JobSyncer, PublishingStage};
use jobsync::provider::HttpProviderFactory;
use jobsync::queue::RedisQueue;
use jobsync::storage::{Database, PgChannelRepository, PgImportRepository, PgJobRepository};

pub use import::import;
pub use migrate::migrate;
pub use schedule::schedule;
pub use serve::serve;
pub use worker::worker;

/// Resolve once on Ctrl+C
pub(crate) async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
    }
}

/// Postgres-backed repositories over one pool
pub(crate) struct Repositories {
    pub channels: Arc<PgChannelRepository>,
    pub jobs: Arc<PgJobRepository>,
    pub imports: Arc<PgImportRepository>,
}

impl Repositories {
    pub fn connect(config: &Config) -> Result<Self> {
        let database = Database::connect(&config.database).context("Failed to connect to database")?;
        let pool = database.pool();
        Ok(Self {
            channels: Arc::new(PgChannelRepository::new(pool.clone())),
            jobs: Arc::new(PgJobRepository::new(pool.clone())),
            imports: Arc::new(PgImportRepository::new(pool)),
        })
    }
}

/// Build the import entry point from live dependencies
pub(crate) fn build_action(config: &Config, repos: &Repositories, queue: RedisQueue) -> Result<ImportAction> {
    let providers = HttpProviderFactory::new(&config.gateway).context("Failed to build HTTP client")?;
    let lifecycle = ImportService::new(repos.imports.clone());

    let syncer = JobSyncer::new(
        repos.jobs.clone(),
        config.import.job_workers,
        config.import.job_buffer,
    );
    let publishing = PublishingStage::new(
        repos.jobs.clone(),
        Arc::new(queue),
        lifecycle.clone(),
        config.import.announce_missing,
    );
    let runner = ImportRunner::new(syncer, lifecycle, publishing, &config.import);

    Ok(ImportAction::new(
        repos.channels.clone(),
        Arc::new(providers),
        runner,
    ))
}
