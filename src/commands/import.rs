use anyhow::{Context, Result};
use uuid::Uuid;

use jobsync::config::Config;
use jobsync::error::{Error, JobsyncErrorTrait};
use jobsync::queue::RedisQueue;

use super::{build_action, Repositories};

/// Run one import in this process
pub async fn import(config: &Config, import_id: Uuid) -> Result<()> {
    let repos = Repositories::connect(config)?;
    let queue = RedisQueue::connect(&config.queue)
        .await
        .context("Failed to connect to Redis")?;
    let action = build_action(config, &repos, queue)?;

    match action.execute(import_id).await {
        Ok(import) => {
            let summary = import.summary();
            println!("Import {} {}", import.id, import.status());
            println!("  New: {}", summary.new);
            println!("  Updated: {}", summary.updated);
            println!("  Unchanged: {}", summary.no_change);
            println!("  Missing: {}", summary.missing);
            println!("  Errors: {}", summary.errors);
            println!(
                "  Published: {} ({} late)",
                summary.published + summary.late_published,
                summary.late_published
            );
            Ok(())
        }
        Err(e) => {
            let err = Error::from(e);
            tracing::error!(
                %import_id,
                category = err.category().as_str(),
                recoverable = err.is_recoverable(),
                "import failed: {err}"
            );
            Err(err.into())
        }
    }
}
