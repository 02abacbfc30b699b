//! Unified error handling for the jobsync crate
//!
//! Each subsystem keeps its own error type. [`Error`] wraps all of them so
//! the command layer can use a single `Result` while still asking whether a
//! failure is worth retrying.
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobsync::error::{Error, ErrorCategory, JobsyncErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "retry later: {err}");
//!     } else {
//!         tracing::error!("{err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::importer::{ImportError, LifecycleError, PublishingError, SyncError};
pub use crate::provider::ProviderError;
pub use crate::queue::QueueError;
pub use crate::scheduler::SchedulerError;
pub use crate::storage::StorageError;

/// Common interface for classifying failures
pub trait JobsyncErrorTrait: std::error::Error {
    /// Whether the same operation may succeed when tried again
    fn is_recoverable(&self) -> bool;

    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Upstream job board (HTTP, decoding)
    Network,
    /// Postgres
    Storage,
    /// Redis transport
    Queue,
    /// Import state machine
    Lifecycle,
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Queue => "queue",
            Self::Lifecycle => "lifecycle",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the jobsync crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Publishing error: {0}")]
    Publishing(#[from] PublishingError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Config error: {0}")]
    Config(String),
}

fn storage_recoverable(err: &StorageError) -> bool {
    matches!(
        err,
        StorageError::Pool(_) | StorageError::Query { .. } | StorageError::Unavailable(_)
    )
}

fn lifecycle_recoverable(err: &LifecycleError) -> bool {
    match err {
        LifecycleError::Storage { source, .. } => storage_recoverable(source),
        LifecycleError::InvalidTransition { .. }
        | LifecycleError::TerminalStatus { .. }
        | LifecycleError::NotFound(_) => false,
    }
}

impl JobsyncErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_recoverable(),
            Self::Storage(e) => storage_recoverable(e),
            Self::Sync(SyncError::ExistingJobs(e)) => storage_recoverable(e),
            Self::Sync(SyncError::Save { .. }) => true,
            Self::Lifecycle(e) => lifecycle_recoverable(e),
            Self::Import(e) => match e {
                ImportError::Fetch { source, .. } | ImportError::FetchUnrecorded { source, .. } => {
                    source.is_recoverable()
                }
                ImportError::Sync { .. } => true,
                ImportError::Channel { source, .. } => storage_recoverable(source),
                ImportError::Provider { .. } => false,
                ImportError::Lifecycle(e) => lifecycle_recoverable(e),
                ImportError::Publishing(_) => true,
            },
            Self::Publishing(_) => true,
            Self::Queue(e) => e.is_recoverable(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Provider(_) => ErrorCategory::Network,
            Self::Storage(_) | Self::Sync(_) | Self::Publishing(_) => ErrorCategory::Storage,
            Self::Lifecycle(_) => ErrorCategory::Lifecycle,
            Self::Import(e) => match e {
                ImportError::Fetch { .. }
                | ImportError::FetchUnrecorded { .. }
                | ImportError::Provider { .. } => ErrorCategory::Network,
                ImportError::Lifecycle(_) => ErrorCategory::Lifecycle,
                ImportError::Sync { .. }
                | ImportError::Channel { .. }
                | ImportError::Publishing(_) => ErrorCategory::Storage,
            },
            Self::Queue(_) => ErrorCategory::Queue,
            Self::Scheduler(e) => match e {
                SchedulerError::PublishCommand { .. } => ErrorCategory::Queue,
                SchedulerError::Channel { source, .. }
                    if matches!(source.as_ref(), SchedulerError::PublishCommand { .. }) =>
                {
                    ErrorCategory::Queue
                }
                _ => ErrorCategory::Storage,
            },
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
