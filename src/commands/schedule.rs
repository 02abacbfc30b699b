use anyhow::{Context, Result};

use jobsync::config::Config;
use jobsync::error::{Error, JobsyncErrorTrait};
use jobsync::importer::ImportService;
use jobsync::queue::RedisQueue;
use jobsync::scheduler::Scheduler;

use super::Repositories;

/// Create and publish one import per active channel
pub async fn schedule(config: &Config) -> Result<()> {
    let repos = Repositories::connect(config)?;
    let queue = RedisQueue::connect(&config.queue)
        .await
        .context("Failed to connect to Redis")?;

    let scheduler = Scheduler::new(
        repos.channels.clone(),
        ImportService::new(repos.imports.clone()),
        std::sync::Arc::new(queue),
    );

    match scheduler.schedule_active_channels().await {
        Ok(imports) => {
            println!("Scheduled {} imports", imports.len());
            for import in &imports {
                println!("  {} (channel {})", import.id, import.channel_id);
            }
            Ok(())
        }
        Err(e) => {
            let err = Error::from(e);
            tracing::error!(
                category = err.category().as_str(),
                recoverable = err.is_recoverable(),
                "scheduling stopped: {err}"
            );
            Err(err.into())
        }
    }
}
