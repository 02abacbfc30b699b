use anyhow::{Context, Result};

use jobsync::config::Config;
use jobsync::storage::Database;

/// Create tables and indexes
pub async fn migrate(config: &Config) -> Result<()> {
    let database = Database::connect(&config.database)?;
    database
        .init_schema()
        .await
        .context("Failed to initialize database schema")?;

    println!("Database schema is up to date");
    Ok(())
}
