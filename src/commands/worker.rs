use anyhow::{Context, Result};

use jobsync::config::Config;
use jobsync::consumer::{run_worker, CommandHandler};
use jobsync::queue::RedisQueue;

use super::{build_action, shutdown_signal, Repositories};

/// Consume import commands from Redis until Ctrl+C
pub async fn worker(config: &Config) -> Result<()> {
    let repos = Repositories::connect(config)?;
    let queue = RedisQueue::connect(&config.queue)
        .await
        .context("Failed to connect to Redis")?;
    let handler = CommandHandler::new(build_action(config, &repos, queue.clone())?);

    run_worker(
        &queue,
        handler,
        std::time::Duration::from_secs(config.queue.poll_timeout_secs),
        shutdown_signal(),
    )
    .await;

    Ok(())
}
