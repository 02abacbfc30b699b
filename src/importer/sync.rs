//! Reconciliation of an incoming snapshot against stored jobs
//!
//! ```text
//!  incoming ──▶ decision loop ──▶ job queue ──▶ save workers ──▶ JobRepository
//!                    │                              │
//!                    ▼                              ▼
//!              decision queue ◀──── error ──── failure collector
//! ```
//!
//! The decision loop is sequential; saves run on a fixed pool of workers
//! draining a bounded queue. Save failures are collected by a single task
//! and returned together once every worker has finished.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::metrics;
use crate::models::{Job, JobStatus, MetricType};
use crate::storage::{JobRepository, StorageError};

/// Outcome of reconciliation for one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    New,
    Updated,
    NoChange,
    Missing,
    /// The job's save failed
    Error,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        self.metric_type().as_str()
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::New => MetricType::New,
            Self::Updated => MetricType::Updated,
            Self::NoChange => MetricType::NoChange,
            Self::Missing => MetricType::Missing,
            Self::Error => MetricType::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub job_id: Uuid,
    pub kind: DecisionKind,
    pub error: Option<String>,
}

impl Decision {
    fn new(job_id: Uuid, kind: DecisionKind) -> Self {
        Self {
            job_id,
            kind,
            error: None,
        }
    }

    fn failed(job_id: Uuid, error: String) -> Self {
        Self {
            job_id,
            kind: DecisionKind::Error,
            error: Some(error),
        }
    }
}

/// A single failed job write
#[derive(Debug)]
pub struct SaveFailure {
    pub job_id: Uuid,
    pub source: StorageError,
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to save job {}: {}", self.job_id, self.source)
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    /// Stored jobs could not be loaded; nothing was written
    #[error("failed to get existing jobs: {0}")]
    ExistingJobs(#[source] StorageError),

    /// One or more saves failed; the remaining saves still ran
    #[error("{}", join_failures(.failures))]
    Save { failures: Vec<SaveFailure> },
}

fn join_failures(failures: &[SaveFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reconciliation engine for one channel's jobs
#[derive(Clone)]
pub struct JobSyncer {
    jobs: Arc<dyn JobRepository>,
    workers: usize,
    buffer: usize,
}

impl JobSyncer {
    pub fn new(jobs: Arc<dyn JobRepository>, workers: usize, buffer: usize) -> Self {
        Self {
            jobs,
            workers: workers.max(1),
            buffer: buffer.max(1),
        }
    }

    /// Reconcile `incoming` with the stored jobs of `channel_id`.
    ///
    /// Emits one decision per job on `decisions`; the caller drains it and
    /// closes it after this returns.
    pub async fn sync(
        &self,
        channel_id: Uuid,
        incoming: Vec<Job>,
        decisions: &mpsc::Sender<Decision>,
    ) -> Result<(), SyncError> {
        let existing = self
            .jobs
            .get_by_channel_id(channel_id)
            .await
            .map_err(SyncError::ExistingJobs)?;

        let (job_tx, job_rx) = mpsc::channel::<Job>(self.buffer);
        let (error_tx, mut error_rx) = mpsc::channel::<SaveFailure>(self.buffer);

        let collector: JoinHandle<Vec<SaveFailure>> = tokio::spawn(async move {
            let mut failures = Vec::new();
            while let Some(failure) = error_rx.recv().await {
                failures.push(failure);
            }
            failures
        });

        let workers = self.spawn_save_workers(job_rx, error_tx, decisions.clone());

        let stored: HashMap<Uuid, &Job> = existing.iter().map(|job| (job.id, job)).collect();
        let incoming_ids: HashSet<Uuid> = incoming.iter().map(|job| job.id).collect();

        tracing::debug!(
            %channel_id,
            incoming = incoming.len(),
            stored = existing.len(),
            "reconciling jobs"
        );

        for mut job in incoming {
            let kind = match stored.get(&job.id) {
                Some(current) if current.same_content(&job) => {
                    emit(decisions, Decision::new(job.id, DecisionKind::NoChange)).await;
                    continue;
                }
                Some(_) => DecisionKind::Updated,
                None => DecisionKind::New,
            };

            job.mark_as_changed();
            let job_id = job.id;
            if job_tx.send(job).await.is_err() {
                tracing::error!(%channel_id, "job save queue closed");
                break;
            }
            emit(decisions, Decision::new(job_id, kind)).await;
        }

        for current in &existing {
            if current.status == JobStatus::Inactive || incoming_ids.contains(&current.id) {
                continue;
            }

            let mut job = current.clone();
            job.mark_as_missing();
            let job_id = job.id;
            if job_tx.send(job).await.is_err() {
                tracing::error!(%channel_id, "job save queue closed");
                break;
            }
            emit(decisions, Decision::new(job_id, DecisionKind::Missing)).await;
        }

        drop(job_tx);
        for joined in join_all(workers).await {
            if let Err(e) = joined {
                tracing::error!(%channel_id, error = %e, "job save worker panicked");
            }
        }

        let failures = collector.await.unwrap_or_else(|e| {
            tracing::error!(%channel_id, error = %e, "save failure collector panicked");
            Vec::new()
        });

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Save { failures })
        }
    }

    fn spawn_save_workers(
        &self,
        job_rx: mpsc::Receiver<Job>,
        error_tx: mpsc::Sender<SaveFailure>,
        decisions: mpsc::Sender<Decision>,
    ) -> Vec<JoinHandle<()>> {
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let mut handles = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let job_rx = Arc::clone(&job_rx);
            let error_tx = error_tx.clone();
            let decisions = decisions.clone();
            let repo = Arc::clone(&self.jobs);

            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        rx.recv().await
                    };

                    let Some(job) = job else { break };

                    if let Err(source) = repo.save(&job).await {
                        tracing::warn!(worker_id, job_id = %job.id, error = %source, "failed to save job");
                        let message = source.to_string();
                        let _ = error_tx
                            .send(SaveFailure {
                                job_id: job.id,
                                source,
                            })
                            .await;
                        emit(&decisions, Decision::failed(job.id, message)).await;
                    }
                }

                tracing::trace!(worker_id, "job save worker shutting down");
            }));
        }

        handles
    }
}

async fn emit(decisions: &mpsc::Sender<Decision>, decision: Decision) {
    metrics::record_decision(decision.kind.as_str());
    if decisions.send(decision).await.is_err() {
        tracing::warn!("decision queue closed, dropping decision");
    }
}
