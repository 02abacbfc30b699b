//! jobsync - job posting import engine
//!
//! Pulls job postings from external job boards, reconciles them against the
//! stored catalog, announces new and changed postings downstream and keeps a
//! per-run ledger of everything it decided.
//!
//! # Architecture
//!
//! - [`provider`] - Job board clients producing normalized snapshots
//! - [`importer`] - Reconciliation, import lifecycle and publishing
//! - [`scheduler`] - Creates pending imports and enqueues their commands
//! - [`consumer`] - Executes import commands from the queue
//! - [`server`] - Push endpoint, health and metrics over HTTP
//! - [`storage`] - PostgreSQL repositories and in-memory mocks
//! - [`queue`] - Redis command and event transport
//! - [`models`] - Channels, jobs, imports and their state machines
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jobsync::config::Config;
//! use jobsync::importer::ImportService;
//! use jobsync::queue::RedisQueue;
//! use jobsync::scheduler::Scheduler;
//! use jobsync::storage::{Database, PgChannelRepository, PgImportRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database)?;
//!     let queue = RedisQueue::connect(&config.queue).await?;
//!     let scheduler = Scheduler::new(
//!         Arc::new(PgChannelRepository::new(db.pool())),
//!         ImportService::new(Arc::new(PgImportRepository::new(db.pool()))),
//!         Arc::new(queue),
//!     );
//!     scheduler.schedule_active_channels().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod importer;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod queue;
pub mod scheduler;
pub mod server;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::consumer::{Ack, CommandHandler};
    pub use crate::error::{Error, ErrorCategory, JobsyncErrorTrait, Result};
    pub use crate::importer::{ImportAction, ImportRunner, ImportService, JobSyncer, PublishingStage};
    pub use crate::models::{Channel, Import, ImportStatus, Integration, Job, JobStatus, PublishStatus};
    pub use crate::provider::{Provider, ProviderFactory};
    pub use crate::scheduler::Scheduler;
}

pub use models::{Channel, Import, ImportStatus, Job};
