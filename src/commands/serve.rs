use anyhow::{Context, Result};

use jobsync::config::Config;
use jobsync::consumer::CommandHandler;
use jobsync::queue::RedisQueue;
use jobsync::server::{start_with_shutdown, AppState};

use super::{build_action, shutdown_signal, Repositories};

/// Serve the push endpoint, health and metrics
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config.bind_address()?;
    let repos = Repositories::connect(config)?;
    let queue = RedisQueue::connect(&config.queue)
        .await
        .context("Failed to connect to Redis")?;
    let handler = CommandHandler::new(build_action(config, &repos, queue)?);

    println!("Starting jobsync server");
    println!("  Bind Address: {addr}");
    println!();

    start_with_shutdown(addr, AppState { handler }, shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}
