//! Publishing stage: turn reconciliation results into downstream events

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use super::lifecycle::ImportService;
use crate::metrics;
use crate::models::{Import, ImportMetric, MetricType};
use crate::queue::EventPublisher;
use crate::storage::{JobRepository, StorageError};

#[derive(Error, Debug)]
pub enum PublishingError {
    #[error("failed to get publishable jobs for channel {channel_id}: {source}")]
    Candidates {
        channel_id: Uuid,
        #[source]
        source: StorageError,
    },
}

/// What one publishing pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Jobs changed in this run and announced
    pub published: usize,
    /// Jobs left unpublished by an earlier run and announced now
    pub late_published: usize,
    /// Jobs whose event or state update failed
    pub failed: usize,
    /// Missing jobs announced
    pub missing_published: usize,
}

impl PublishReport {
    pub fn total_published(&self) -> usize {
        self.published + self.late_published
    }
}

#[derive(Clone)]
pub struct PublishingStage {
    jobs: Arc<dyn JobRepository>,
    events: Arc<dyn EventPublisher>,
    lifecycle: ImportService,
    announce_missing: bool,
}

impl PublishingStage {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        events: Arc<dyn EventPublisher>,
        lifecycle: ImportService,
        announce_missing: bool,
    ) -> Self {
        Self {
            jobs,
            events,
            lifecycle,
            announce_missing,
        }
    }

    /// Announce every active, unpublished job of the import's channel.
    ///
    /// `changed` holds the jobs decided new or updated in this run;
    /// `missing` the jobs decided missing. Per-job failures are logged
    /// and skipped.
    pub async fn publish(
        &self,
        import: &Import,
        changed: &HashSet<Uuid>,
        missing: &[Uuid],
    ) -> Result<PublishReport, PublishingError> {
        let candidates = self
            .jobs
            .get_active_unpublished_by_channel_id(import.channel_id)
            .await
            .map_err(|source| PublishingError::Candidates {
                channel_id: import.channel_id,
                source,
            })?;

        let mut report = PublishReport::default();

        for mut job in candidates {
            if let Err(e) = self.events.publish_job_information(&job).await {
                tracing::error!(import_id = %import.id, job_id = %job.id, error = %e, "failed to publish job information");
                metrics::record_publish("job_information", false);
                report.failed += 1;
                continue;
            }
            metrics::record_publish("job_information", true);

            job.mark_as_published();
            if let Err(e) = self.jobs.save(&job).await {
                tracing::error!(import_id = %import.id, job_id = %job.id, error = %e, "failed to mark job as published");
                report.failed += 1;
                continue;
            }

            let metric_type = if changed.contains(&job.id) {
                report.published += 1;
                MetricType::Publish
            } else {
                report.late_published += 1;
                MetricType::LatePublish
            };
            self.record(import.id, job.id, metric_type).await;
        }

        tracing::info!(
            import_id = %import.id,
            late = report.late_published,
            failed = report.failed,
            "published {} jobs for import {}",
            report.total_published(),
            import.id
        );

        if self.announce_missing && !missing.is_empty() {
            report.missing_published = self.announce_missing_jobs(import, missing).await;
        }

        Ok(report)
    }

    async fn announce_missing_jobs(&self, import: &Import, missing: &[Uuid]) -> usize {
        let wanted: HashSet<Uuid> = missing.iter().copied().collect();
        let stored = match self.jobs.get_by_channel_id(import.channel_id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(import_id = %import.id, error = %e, "failed to load missing jobs");
                return 0;
            }
        };

        let mut announced = 0;
        for job in stored.iter().filter(|job| wanted.contains(&job.id)) {
            match self.events.publish_job_missing(job).await {
                Ok(()) => {
                    metrics::record_publish("job_missing", true);
                    self.record(import.id, job.id, MetricType::MissingPublish)
                        .await;
                    announced += 1;
                }
                Err(e) => {
                    metrics::record_publish("job_missing", false);
                    tracing::error!(import_id = %import.id, job_id = %job.id, error = %e, "failed to publish job missing");
                }
            }
        }

        tracing::info!(import_id = %import.id, "announced {announced} missing jobs");
        announced
    }

    async fn record(&self, import_id: Uuid, job_id: Uuid, metric_type: MetricType) {
        let metric = ImportMetric::new(import_id, job_id, metric_type, None);
        if let Err(e) = self.lifecycle.save_metric(import_id, &metric).await {
            tracing::warn!(%import_id, %job_id, error = %e, "failed to save publish metric");
        }
    }
}
