//! Drives one import run through fetching, processing and publishing
//!
//! ```text
//! pending ─▶ fetching ─▶ processing ─▶ publishing ─▶ completed
//!               │
//!               └──────▶ failed
//! ```
//!
//! Only a fetch error marks the run failed. A reconciliation or publishing
//! candidate error is returned to the caller and the import keeps the
//! status it last persisted.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::lifecycle::{ImportService, LifecycleError};
use super::publishing::{PublishingError, PublishingStage};
use super::sync::{Decision, DecisionKind, JobSyncer, SyncError};
use crate::config::ImportConfig;
use crate::models::{Import, ImportMetric, ImportStatus};
use crate::provider::{Provider, ProviderError};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ImportError {
    /// Upstream fetch failed; the import was marked failed
    #[error("failed to import channel {channel_id}: {source}")]
    Fetch {
        channel_id: Uuid,
        #[source]
        source: ProviderError,
    },

    /// Upstream fetch failed and the failure could not be recorded
    #[error("failed to import channel {channel_id}: {source}; failed to mark import as failed: {mark}")]
    FetchUnrecorded {
        channel_id: Uuid,
        #[source]
        source: ProviderError,
        mark: LifecycleError,
    },

    /// Reconciliation failed; the import stays in processing
    #[error("failed to sync jobs for channel {channel_id}: {source}")]
    Sync {
        channel_id: Uuid,
        #[source]
        source: SyncError,
    },

    #[error("failed to find channel {channel_id}: {source}")]
    Channel {
        channel_id: Uuid,
        #[source]
        source: StorageError,
    },

    #[error("failed to create provider for channel {channel_id}: {source}")]
    Provider {
        channel_id: Uuid,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Publishing(#[from] PublishingError),
}

/// Per-writer view of the decisions it persisted
#[derive(Default)]
struct Tally {
    changed: HashSet<Uuid>,
    missing: Vec<Uuid>,
}

impl Tally {
    fn merge(&mut self, other: Tally) {
        self.changed.extend(other.changed);
        self.missing.extend(other.missing);
    }
}

#[derive(Clone)]
pub struct ImportRunner {
    syncer: JobSyncer,
    lifecycle: ImportService,
    publishing: PublishingStage,
    metric_workers: usize,
    metric_buffer: usize,
}

impl ImportRunner {
    pub fn new(
        syncer: JobSyncer,
        lifecycle: ImportService,
        publishing: PublishingStage,
        config: &ImportConfig,
    ) -> Self {
        Self {
            syncer,
            lifecycle,
            publishing,
            metric_workers: config.metric_workers.max(1),
            metric_buffer: config.metric_buffer.max(1),
        }
    }

    pub fn lifecycle(&self) -> &ImportService {
        &self.lifecycle
    }

    /// Execute one run for an already loaded import
    pub async fn run(&self, provider: &dyn Provider, import: &mut Import) -> Result<(), ImportError> {
        let channel_id = provider.channel().id;
        tracing::info!(import_id = %import.id, %channel_id, "starting import");

        self.lifecycle
            .set_status(import, ImportStatus::Fetching)
            .await?;

        let jobs = match provider.get_jobs().await {
            Ok(jobs) => jobs,
            Err(source) => {
                tracing::error!(import_id = %import.id, %channel_id, error = %source, "failed to fetch jobs");
                let message = format!("failed to import channel {channel_id}: {source}");
                return Err(match self.lifecycle.mark_failed(import, message).await {
                    Ok(()) => ImportError::Fetch { channel_id, source },
                    Err(mark) => ImportError::FetchUnrecorded {
                        channel_id,
                        source,
                        mark,
                    },
                });
            }
        };

        self.lifecycle
            .set_status(import, ImportStatus::Processing)
            .await?;

        let (decision_tx, decision_rx) = mpsc::channel::<Decision>(self.metric_buffer);
        let writers = self.spawn_metric_writers(import.id, decision_rx);

        let synced = self.syncer.sync(channel_id, jobs, &decision_tx).await;

        drop(decision_tx);
        let mut tally = Tally::default();
        for joined in join_all(writers).await {
            match joined {
                Ok(part) => tally.merge(part),
                Err(e) => tracing::error!(import_id = %import.id, error = %e, "metric writer panicked"),
            }
        }

        if let Err(source) = synced {
            tracing::error!(import_id = %import.id, %channel_id, error = %source, "failed to sync jobs");
            return Err(ImportError::Sync { channel_id, source });
        }

        self.lifecycle
            .set_status(import, ImportStatus::Publishing)
            .await?;

        self.publishing
            .publish(import, &tally.changed, &tally.missing)
            .await?;

        self.lifecycle.mark_completed(import).await?;
        Ok(())
    }

    fn spawn_metric_writers(
        &self,
        import_id: Uuid,
        decision_rx: mpsc::Receiver<Decision>,
    ) -> Vec<JoinHandle<Tally>> {
        let decision_rx = Arc::new(tokio::sync::Mutex::new(decision_rx));
        let mut handles = Vec::with_capacity(self.metric_workers);

        for worker_id in 0..self.metric_workers {
            let decision_rx = Arc::clone(&decision_rx);
            let lifecycle = self.lifecycle.clone();

            handles.push(tokio::spawn(async move {
                let mut tally = Tally::default();

                loop {
                    let decision = {
                        let mut rx = decision_rx.lock().await;
                        rx.recv().await
                    };

                    let Some(decision) = decision else { break };

                    match decision.kind {
                        DecisionKind::New | DecisionKind::Updated => {
                            tally.changed.insert(decision.job_id);
                        }
                        DecisionKind::Missing => tally.missing.push(decision.job_id),
                        DecisionKind::NoChange | DecisionKind::Error => {}
                    }

                    let metric = ImportMetric::new(
                        import_id,
                        decision.job_id,
                        decision.kind.metric_type(),
                        decision.error,
                    );
                    if let Err(e) = lifecycle.save_metric(import_id, &metric).await {
                        tracing::warn!(worker_id, %import_id, job_id = %metric.job_id, error = %e, "failed to save import metric");
                    }
                }

                tally
            }));
        }

        handles
    }
}
