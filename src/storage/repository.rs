//! Repository traits for the import engine
//!
//! Business logic only talks to these traits, so the PostgreSQL
//! implementations in [`super::postgres`] and the in-memory mocks below
//! are interchangeable.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Scheduler / Import runner / Publishing stage         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   ChannelRepository, JobRepository, ImportRepository        │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//!        ┌─────────────────┐            ┌─────────────────┐
//!        │   PostgreSQL    │            │      Mock       │
//!        └─────────────────┘            └─────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::{StorageError, StorageResult};
use crate::models::{Channel, Import, ImportMetric, Job, JobStatus, PublishStatus};

// ============================================================================
// Repository Traits
// ============================================================================

/// Read access to channel configuration
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// All channels with status active
    async fn get_active(&self) -> StorageResult<Vec<Channel>>;

    /// Find a channel by id
    async fn find(&self, id: Uuid) -> StorageResult<Channel>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Upsert a job by id
    async fn save(&self, job: &Job) -> StorageResult<()>;

    /// All stored jobs of a channel, newest posting first
    async fn get_by_channel_id(&self, channel_id: Uuid) -> StorageResult<Vec<Job>>;

    /// Jobs waiting to be announced downstream
    async fn get_active_unpublished_by_channel_id(&self, channel_id: Uuid)
        -> StorageResult<Vec<Job>>;
}

#[async_trait]
pub trait ImportRepository: Send + Sync {
    /// Upsert an import row (metrics are stored separately)
    async fn save_import(&self, import: &Import) -> StorageResult<()>;

    /// Upsert a metric row by id
    async fn save_import_metric(&self, import_id: Uuid, metric: &ImportMetric)
        -> StorageResult<()>;

    /// Find an import with its metric rows
    async fn find_import(&self, id: Uuid) -> StorageResult<Import>;

    /// All imports, most recent first, with their metric rows
    async fn get_imports(&self) -> StorageResult<Vec<Import>>;

    /// Metric rows of one import
    async fn get_import_metrics(&self, import_id: Uuid) -> StorageResult<Vec<ImportMetric>>;
}

/// Thread-safe shared repository handles
pub type SharedChannelRepository = Arc<dyn ChannelRepository>;
pub type SharedJobRepository = Arc<dyn JobRepository>;
pub type SharedImportRepository = Arc<dyn ImportRepository>;

fn unavailable(operation: &str) -> StorageError {
    StorageError::Unavailable(format!("{operation} disabled in mock"))
}

// ============================================================================
// Mock Implementations
// ============================================================================

/// In-memory channel repository for testing
#[derive(Default)]
pub struct MockChannelRepository {
    channels: RwLock<HashMap<Uuid, Channel>>,
    fail_reads: AtomicBool,
}

impl MockChannelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, channel: Channel) {
        self.channels.write().unwrap().insert(channel.id, channel);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelRepository for MockChannelRepository {
    async fn get_active(&self) -> StorageResult<Vec<Channel>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("get active channels"));
        }
        let channels = self.channels.read().unwrap();
        let mut active: Vec<Channel> = channels.values().filter(|c| c.is_active()).cloned().collect();
        active.sort_by_key(|c| c.created_at);
        Ok(active)
    }

    async fn find(&self, id: Uuid) -> StorageResult<Channel> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("find channel"));
        }
        self.channels
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "channel",
                id,
            })
    }
}

/// In-memory job repository for testing
#[derive(Default)]
pub struct MockJobRepository {
    jobs: RwLock<HashMap<Uuid, Job>>,
    save_calls: RwLock<Vec<Uuid>>,
    failing_saves: RwLock<HashSet<Uuid>>,
    fail_reads: AtomicBool,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored job without counting it as a save
    pub fn insert(&self, job: Job) {
        self.jobs.write().unwrap().insert(job.id, job);
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Job> {
        self.jobs.read().unwrap().values().cloned().collect()
    }

    /// Ids passed to `save`, in call order
    pub fn save_calls(&self) -> Vec<Uuid> {
        self.save_calls.read().unwrap().clone()
    }

    /// Make `save` fail for the given job id
    pub fn fail_save_for(&self, id: Uuid) {
        self.failing_saves.write().unwrap().insert(id);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn save(&self, job: &Job) -> StorageResult<()> {
        self.save_calls.write().unwrap().push(job.id);
        if self.failing_saves.read().unwrap().contains(&job.id) {
            return Err(StorageError::Unavailable(format!("failed to save job {}", job.id)));
        }
        self.jobs.write().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_channel_id(&self, channel_id: Uuid) -> StorageResult<Vec<Job>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("get jobs by channel"));
        }
        let jobs = self.jobs.read().unwrap();
        let mut found: Vec<Job> = jobs
            .values()
            .filter(|j| j.channel_id == channel_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(found)
    }

    async fn get_active_unpublished_by_channel_id(
        &self,
        channel_id: Uuid,
    ) -> StorageResult<Vec<Job>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("get publishable jobs"));
        }
        let jobs = self.jobs.read().unwrap();
        Ok(jobs
            .values()
            .filter(|j| {
                j.channel_id == channel_id
                    && j.status == JobStatus::Active
                    && j.publish_status == PublishStatus::Unpublished
            })
            .cloned()
            .collect())
    }
}

/// In-memory import repository for testing.
///
/// Keeps every saved status so tests can assert on the lifecycle path.
#[derive(Default)]
pub struct MockImportRepository {
    imports: RwLock<HashMap<Uuid, Import>>,
    metrics: RwLock<HashMap<Uuid, ImportMetric>>,
    history: RwLock<Vec<(Uuid, crate::models::ImportStatus)>>,
    fail_import_saves: AtomicBool,
    fail_metric_saves: AtomicBool,
}

impl MockImportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses saved for an import, in order
    pub fn status_history(&self, id: Uuid) -> Vec<crate::models::ImportStatus> {
        self.history
            .read()
            .unwrap()
            .iter()
            .filter(|(import_id, _)| *import_id == id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn imports(&self) -> Vec<Import> {
        self.imports.read().unwrap().values().cloned().collect()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.read().unwrap().len()
    }

    pub fn set_fail_import_saves(&self, fail: bool) {
        self.fail_import_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_metric_saves(&self, fail: bool) {
        self.fail_metric_saves.store(fail, Ordering::SeqCst);
    }

    fn metrics_for(&self, import_id: Uuid) -> Vec<ImportMetric> {
        let mut rows: Vec<ImportMetric> = self
            .metrics
            .read()
            .unwrap()
            .values()
            .filter(|m| m.import_id == import_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        rows
    }
}

#[async_trait]
impl ImportRepository for MockImportRepository {
    async fn save_import(&self, import: &Import) -> StorageResult<()> {
        if self.fail_import_saves.load(Ordering::SeqCst) {
            return Err(unavailable("save import"));
        }
        self.history
            .write()
            .unwrap()
            .push((import.id, import.status()));
        self.imports
            .write()
            .unwrap()
            .insert(import.id, import.clone().with_metrics(Vec::new()));
        Ok(())
    }

    async fn save_import_metric(
        &self,
        import_id: Uuid,
        metric: &ImportMetric,
    ) -> StorageResult<()> {
        if self.fail_metric_saves.load(Ordering::SeqCst) {
            return Err(unavailable("save import metric"));
        }
        let mut row = metric.clone();
        row.import_id = import_id;
        self.metrics.write().unwrap().insert(row.id, row);
        Ok(())
    }

    async fn find_import(&self, id: Uuid) -> StorageResult<Import> {
        let import = self
            .imports
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "import",
                id,
            })?;
        Ok(import.with_metrics(self.metrics_for(id)))
    }

    async fn get_imports(&self) -> StorageResult<Vec<Import>> {
        let mut imports: Vec<Import> = self
            .imports()
            .into_iter()
            .map(|i| {
                let metrics = self.metrics_for(i.id);
                i.with_metrics(metrics)
            })
            .collect();
        imports.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(imports)
    }

    async fn get_import_metrics(&self, import_id: Uuid) -> StorageResult<Vec<ImportMetric>> {
        Ok(self.metrics_for(import_id))
    }
}

// ============================================================================
// Tests
// ============================================================================
