use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use jobsync::config::Config;
use jobsync::error::Error;

mod commands;

#[derive(Parser)]
#[command(
    name = "jobsync",
    version,
    about = "Imports job postings from job boards and publishes changes downstream",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file; environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Migrate,

    /// Schedule an import for every active channel
    Schedule,

    /// Execute one scheduled import in this process
    Import {
        /// Import id
        #[arg(long)]
        id: Uuid,
    },

    /// Consume import commands from Redis
    Worker,

    /// Serve the push endpoint, health and metrics
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config
        .validate()
        .map_err(|e| Error::config(format!("{e:#}")))?;

    let format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(format, &config.logging.level, cli.verbose)?;

    if let Err(e) = jobsync::metrics::init_metrics() {
        tracing::warn!(error = %e, "Prometheus metrics disabled");
    }

    tracing::info!("jobsync starting");

    match cli.command {
        Commands::Migrate => commands::migrate(&config).await?,
        Commands::Schedule => commands::schedule(&config).await?,
        Commands::Import { id } => {
            tracing::info!(import_id = %id, "Starting import command");
            commands::import(&config, id).await?;
        }
        Commands::Worker => commands::worker(&config).await?,
        Commands::Serve => commands::serve(&config).await?,
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("jobsync=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("jobsync={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jobsync=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
