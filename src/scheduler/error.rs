//! Error types for the scheduler module

use std::fmt;

use uuid::Uuid;

use crate::importer::LifecycleError;
use crate::queue::QueueError;
use crate::storage::StorageError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Active channels could not be listed
    LoadChannels { source: StorageError },

    /// Pending import could not be persisted; nothing was published
    SaveImport {
        channel_id: Uuid,
        source: LifecycleError,
    },

    /// Import row exists in pending but the command was not published
    PublishCommand {
        import_id: Uuid,
        channel_id: Uuid,
        source: QueueError,
    },

    /// Scheduling stopped at this channel
    Channel {
        channel_id: Uuid,
        source: Box<SchedulerError>,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadChannels { source } => {
                write!(f, "failed to get active channels: {}", source)
            }
            Self::SaveImport { channel_id, source } => {
                write!(
                    f,
                    "failed to save import for channel {} while starting: {}",
                    channel_id, source
                )
            }
            Self::PublishCommand {
                import_id,
                channel_id,
                source,
            } => {
                write!(
                    f,
                    "failed to publish import {} for channel {}: {}",
                    import_id, channel_id, source
                )
            }
            Self::Channel { channel_id, source } => {
                write!(f, "failed to schedule import for channel {}: {}", channel_id, source)
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LoadChannels { source } => Some(source),
            Self::SaveImport { source, .. } => Some(source),
            Self::PublishCommand { source, .. } => Some(source),
            Self::Channel { source, .. } => Some(source.as_ref()),
        }
    }
}

impl SchedulerError {
    /// Whether running the scheduler again may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::LoadChannels { .. } | Self::SaveImport { .. } => true,
            Self::PublishCommand { source, .. } => source.is_recoverable(),
            Self::Channel { source, .. } => source.is_recoverable(),
        }
    }

    /// Import left behind in pending, if publishing was the failing step
    pub fn orphaned_import(&self) -> Option<Uuid> {
        match self {
            Self::PublishCommand { import_id, .. } => Some(*import_id),
            Self::Channel { source, .. } => source.orphaned_import(),
            _ => None,
        }
    }
}
