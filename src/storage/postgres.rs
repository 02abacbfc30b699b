//! PostgreSQL repository implementations

use async_trait::async_trait;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use tokio_postgres::Row;
use uuid::Uuid;

use super::repository::{ChannelRepository, ImportRepository, JobRepository};
use super::{StorageError, StorageResult};
use crate::models::{
    Channel, ChannelStatus, Import, ImportMetric, ImportStatus, Integration, Job, JobStatus,
    MetricType, PublishStatus,
};

fn decode<T>(column: &'static str, value: String, parse: impl Fn(&str) -> Option<T>) -> StorageResult<T> {
    parse(&value).ok_or(StorageError::Decode { column, value })
}

fn channel_from_row(row: &Row) -> StorageResult<Channel> {
    Ok(Channel {
        id: row.get("id"),
        name: row.get("name"),
        integration: decode("integration", row.get("integration"), Integration::parse)?,
        status: decode("channels.status", row.get("status"), ChannelStatus::parse)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn job_from_row(row: &Row) -> StorageResult<Job> {
    Ok(Job {
        id: row.get("id"),
        channel_id: row.get("channel_id"),
        status: decode("jobs.status", row.get("status"), JobStatus::parse)?,
        publish_status: decode("publish_status", row.get("publish_status"), PublishStatus::parse)?,
        url: row.get("url"),
        title: row.get("title"),
        description: row.get("description"),
        source: row.get("source"),
        location: row.get("location"),
        remote: row.get("remote"),
        posted_at: row.get("posted_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn import_from_row(row: &Row) -> StorageResult<Import> {
    Ok(Import::from_parts(
        row.get("id"),
        row.get("channel_id"),
        decode("imports.status", row.get("status"), ImportStatus::parse)?,
        row.get("started_at"),
        row.get("ended_at"),
        row.get("error"),
    ))
}

fn metric_from_row(row: &Row) -> StorageResult<ImportMetric> {
    Ok(ImportMetric {
        id: row.get("id"),
        import_id: row.get("import_id"),
        job_id: row.get("job_id"),
        metric_type: decode("metric_type", row.get("metric_type"), MetricType::parse)?,
        error: row.get("error"),
        created_at: row.get("created_at"),
    })
}

const JOB_COLUMNS: &str = "id, channel_id, status, publish_status, url, title, description, \
     source, location, remote, posted_at, created_at, updated_at";

const METRIC_COLUMNS: &str = "id, import_id, job_id, metric_type, error, created_at";

// ============================================================================
// Channels
// ============================================================================

pub struct PgChannelRepository {
    pool: Pool,
}

impl PgChannelRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn get_active(&self) -> StorageResult<Vec<Channel>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, name, integration, status, created_at, updated_at
                 FROM channels WHERE status = $1 ORDER BY created_at",
                &[&ChannelStatus::Active.as_str()],
            )
            .await
            .map_err(StorageError::query("get active channels"))?;

        rows.iter().map(channel_from_row).collect()
    }

    async fn find(&self, id: Uuid) -> StorageResult<Channel> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, name, integration, status, created_at, updated_at
                 FROM channels WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(StorageError::query("find channel"))?
            .ok_or(StorageError::NotFound {
                entity: "channel",
                id,
            })?;

        channel_from_row(&row)
    }
}

// ============================================================================
// Jobs
// ============================================================================

pub struct PgJobRepository {
    pool: Pool,
}

impl PgJobRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn save(&self, job: &Job) -> StorageResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO jobs (id, channel_id, status, publish_status, url, title, description,
                                   source, location, remote, posted_at, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 ON CONFLICT (id) DO UPDATE SET
                    channel_id = EXCLUDED.channel_id,
                    status = EXCLUDED.status,
                    publish_status = EXCLUDED.publish_status,
                    url = EXCLUDED.url,
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    source = EXCLUDED.source,
                    location = EXCLUDED.location,
                    remote = EXCLUDED.remote,
                    posted_at = EXCLUDED.posted_at,
                    updated_at = EXCLUDED.updated_at",
                &[
                    &job.id,
                    &job.channel_id,
                    &job.status.as_str(),
                    &job.publish_status.as_str(),
                    &job.url,
                    &job.title,
                    &job.description,
                    &job.source,
                    &job.location,
                    &job.remote,
                    &job.posted_at,
                    &job.created_at,
                    &job.updated_at,
                ],
            )
            .await
            .map_err(StorageError::query("save job"))?;

        Ok(())
    }

    async fn get_by_channel_id(&self, channel_id: Uuid) -> StorageResult<Vec<Job>> {
        let client = self.pool.get().await?;
        let query =
            format!("SELECT {JOB_COLUMNS} FROM jobs WHERE channel_id = $1 ORDER BY posted_at DESC");
        let rows = client
            .query(&query, &[&channel_id])
            .await
            .map_err(StorageError::query("get jobs by channel"))?;

        rows.iter().map(job_from_row).collect()
    }

    async fn get_active_unpublished_by_channel_id(
        &self,
        channel_id: Uuid,
    ) -> StorageResult<Vec<Job>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM jobs
             WHERE channel_id = $1 AND status = $2 AND publish_status = $3
             ORDER BY posted_at DESC"
        );
        let rows = client
            .query(
                &query,
                &[
                    &channel_id,
                    &JobStatus::Active.as_str(),
                    &PublishStatus::Unpublished.as_str(),
                ],
            )
            .await
            .map_err(StorageError::query("get publishable jobs"))?;

        rows.iter().map(job_from_row).collect()
    }
}

// ============================================================================
// Imports
// ============================================================================

pub struct PgImportRepository {
    pool: Pool,
}

impl PgImportRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportRepository for PgImportRepository {
    async fn save_import(&self, import: &Import) -> StorageResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO imports (id, channel_id, status, started_at, ended_at, error)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    ended_at = EXCLUDED.ended_at,
                    error = EXCLUDED.error",
                &[
                    &import.id,
                    &import.channel_id,
                    &import.status().as_str(),
                    &import.started_at,
                    &import.ended_at(),
                    &import.error(),
                ],
            )
            .await
            .map_err(StorageError::query("save import"))?;

        Ok(())
    }

    async fn save_import_metric(
        &self,
        import_id: Uuid,
        metric: &ImportMetric,
    ) -> StorageResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO import_metrics (id, import_id, job_id, metric_type, error, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET
                    metric_type = EXCLUDED.metric_type,
                    error = EXCLUDED.error",
                &[
                    &metric.id,
                    &import_id,
                    &metric.job_id,
                    &metric.metric_type.as_str(),
                    &metric.error,
                    &metric.created_at,
                ],
            )
            .await
            .map_err(StorageError::query("save import metric"))?;

        Ok(())
    }

    async fn find_import(&self, id: Uuid) -> StorageResult<Import> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, channel_id, status, started_at, ended_at, error
                 FROM imports WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(StorageError::query("find import"))?
            .ok_or(StorageError::NotFound {
                entity: "import",
                id,
            })?;

        let import = import_from_row(&row)?;
        drop(client);
        let metrics = self.get_import_metrics(id).await?;
        Ok(import.with_metrics(metrics))
    }

    async fn get_imports(&self) -> StorageResult<Vec<Import>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, channel_id, status, started_at, ended_at, error
                 FROM imports ORDER BY started_at DESC",
                &[],
            )
            .await
            .map_err(StorageError::query("get imports"))?;
        let imports = rows.iter().map(import_from_row).collect::<StorageResult<Vec<_>>>()?;

        let ids: Vec<Uuid> = imports.iter().map(|i| i.id).collect();
        let query = format!(
            "SELECT {METRIC_COLUMNS} FROM import_metrics
             WHERE import_id = ANY($1) ORDER BY created_at"
        );
        let metric_rows = client
            .query(&query, &[&ids])
            .await
            .map_err(StorageError::query("get import metrics"))?;

        let mut by_import: HashMap<Uuid, Vec<ImportMetric>> = HashMap::new();
        for row in &metric_rows {
            let metric = metric_from_row(row)?;
            by_import.entry(metric.import_id).or_default().push(metric);
        }

        Ok(imports
            .into_iter()
            .map(|import| {
                let metrics = by_import.remove(&import.id).unwrap_or_default();
                import.with_metrics(metrics)
            })
            .collect())
    }

    async fn get_import_metrics(&self, import_id: Uuid) -> StorageResult<Vec<ImportMetric>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT {METRIC_COLUMNS} FROM import_metrics WHERE import_id = $1 ORDER BY created_at"
        );
        let rows = client
            .query(&query, &[&import_id])
            .await
            .map_err(StorageError::query("get import metrics"))?;

        rows.iter().map(metric_from_row).collect()
    }
}
