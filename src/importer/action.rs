//! Execute an import by id: the entry point behind an import command

use std::sync::Arc;

use uuid::Uuid;

use super::runner::{ImportError, ImportRunner};
use crate::models::Import;
use crate::provider::ProviderFactory;
use crate::storage::ChannelRepository;

#[derive(Clone)]
pub struct ImportAction {
    channels: Arc<dyn ChannelRepository>,
    providers: Arc<dyn ProviderFactory>,
    runner: ImportRunner,
}

impl ImportAction {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        providers: Arc<dyn ProviderFactory>,
        runner: ImportRunner,
    ) -> Self {
        Self {
            channels,
            providers,
            runner,
        }
    }

    /// Load the import and its channel, then run it
    pub async fn execute(&self, import_id: Uuid) -> Result<Import, ImportError> {
        let lifecycle = self.runner.lifecycle();
        let mut import = lifecycle.find(import_id).await?;

        let channel_id = import.channel_id;
        let channel = self
            .channels
            .find(channel_id)
            .await
            .map_err(|source| ImportError::Channel { channel_id, source })?;

        let provider = match self.providers.create(channel) {
            Ok(provider) => provider,
            Err(source) => {
                tracing::error!(%import_id, %channel_id, error = %source, "no provider for channel");
                lifecycle
                    .mark_failed(&mut import, format!("failed to create provider: {source}"))
                    .await?;
                return Err(ImportError::Provider { channel_id, source });
            }
        };

        self.runner.run(provider.as_ref(), &mut import).await?;
        Ok(import)
    }
}
