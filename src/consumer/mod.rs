//! Import command consumer
//!
//! Both delivery paths (the Redis worker loop and the HTTP push endpoint)
//! go through [`CommandHandler`]. Every command is acknowledged whatever
//! the outcome; failures are logged and never redelivered.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use uuid::Uuid;

use crate::importer::ImportAction;
use crate::queue::{CommandSource, ImportCommand};

/// Outcome of handling one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// The import ran to completion
    Processed(Uuid),
    /// The command was consumed without a completed import
    Skipped(String),
}

impl Ack {
    pub fn is_processed(&self) -> bool {
        matches!(self, Ack::Processed(_))
    }
}

#[derive(Clone)]
pub struct CommandHandler {
    action: ImportAction,
}

impl CommandHandler {
    pub fn new(action: ImportAction) -> Self {
        Self { action }
    }

    /// Decode and execute one import command
    pub async fn handle(&self, payload: &[u8]) -> Ack {
        let command: ImportCommand = match serde_json::from_slice(payload) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!(error = %e, "failed to decode import command");
                return Ack::Skipped(format!("invalid import command: {e}"));
            }
        };

        let import_id = command.import_id;
        match self.action.execute(import_id).await {
            Ok(import) => {
                tracing::info!(%import_id, status = %import.status(), "import command processed");
                Ack::Processed(import_id)
            }
            Err(e) => {
                tracing::error!(%import_id, error = %e, "failed to execute import");
                Ack::Skipped(e.to_string())
            }
        }
    }
}

/// Pop commands until `shutdown` resolves.
///
/// Shutdown is only observed between polls, so a pop already in flight is
/// never cancelled and a command it returns is handled before the loop
/// exits. Shutdown therefore waits at most one `poll_timeout`.
pub async fn run_worker(
    source: &impl CommandSource,
    handler: CommandHandler,
    poll_timeout: Duration,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    tracing::info!("import worker started");

    while shutdown.as_mut().now_or_never().is_none() {
        match source.next_command(poll_timeout).await {
            Ok(Some(payload)) => {
                let ack = handler.handle(payload.as_bytes()).await;
                tracing::debug!(?ack, "import command acknowledged");
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "failed to pop import command");
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }

    tracing::info!("import worker stopped");
}
