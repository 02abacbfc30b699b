//! Import scheduling
//!
//! Creates one pending import per active channel and hands it to the
//! command queue. Execution happens elsewhere, usually in another process
//! consuming that queue, so scheduling returns as soon as the command is
//! published.
//!
//! Delivery is at-least-once at best: when publishing fails the pending
//! import row stays behind and nothing retries it.

pub mod error;

use std::sync::Arc;

use crate::importer::ImportService;
use crate::metrics;
use crate::models::{Channel, Import};
use crate::queue::CommandPublisher;
use crate::storage::ChannelRepository;

pub use error::{SchedulerError, SchedulerResult};

#[derive(Clone)]
pub struct Scheduler {
    channels: Arc<dyn ChannelRepository>,
    lifecycle: ImportService,
    commands: Arc<dyn CommandPublisher>,
}

impl Scheduler {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        lifecycle: ImportService,
        commands: Arc<dyn CommandPublisher>,
    ) -> Self {
        Self {
            channels,
            lifecycle,
            commands,
        }
    }

    /// Persist a pending import for the channel and publish its command
    pub async fn schedule_import(&self, channel: &Channel) -> SchedulerResult<Import> {
        tracing::info!(
            channel_id = %channel.id,
            integration = %channel.integration,
            name = %channel.name,
            "scheduling import for channel"
        );

        let import = self.lifecycle.start(channel.id).await.map_err(|source| {
            metrics::record_scheduled(false);
            SchedulerError::SaveImport {
                channel_id: channel.id,
                source,
            }
        })?;

        if let Err(source) = self.commands.publish_import_command(import.id).await {
            metrics::record_scheduled(false);
            tracing::error!(import_id = %import.id, channel_id = %channel.id, error = %source, "import left pending");
            return Err(SchedulerError::PublishCommand {
                import_id: import.id,
                channel_id: channel.id,
                source,
            });
        }

        metrics::record_scheduled(true);
        tracing::debug!(import_id = %import.id, channel_id = %channel.id, "import scheduled");
        Ok(import)
    }

    /// Schedule every active channel in turn, stopping at the first failure
    pub async fn schedule_active_channels(&self) -> SchedulerResult<Vec<Import>> {
        let channels = self
            .channels
            .get_active()
            .await
            .map_err(|source| SchedulerError::LoadChannels { source })?;

        let mut scheduled = Vec::with_capacity(channels.len());
        for channel in &channels {
            let import = self
                .schedule_import(channel)
                .await
                .map_err(|e| SchedulerError::Channel {
                    channel_id: channel.id,
                    source: Box::new(e),
                })?;
            scheduled.push(import);
        }

        tracing::info!(count = scheduled.len(), "scheduled imports for active channels");
        Ok(scheduled)
    }
}
