// Core data structures for the job import engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Upstream integration serving a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    Arbeitnow,
}

impl Integration {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arbeitnow => "arbeitnow",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "arbeitnow" => Some(Self::Arbeitnow),
            _ => None,
        }
    }
}

impl fmt::Display for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Active,
    Inactive,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// A configured external job source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub integration: Integration,
    pub status: ChannelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// Create an active channel with a fresh id
    pub fn new(name: impl Into<String>, integration: Integration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            integration,
            status: ChannelStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ChannelStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Inactive,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Unpublished,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpublished => "unpublished",
            Self::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpublished" => Some(Self::Unpublished),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// Canonical job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub status: JobStatus,
    pub publish_status: PublishStatus,
    pub url: String,
    pub title: String,
    pub description: String,
    pub source: String,
    pub location: String,
    pub remote: bool,
    pub posted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Derive the stable job id for an upstream posting.
    ///
    /// Name-based UUIDv5 keyed on the channel id, so the same slug always
    /// lands on the same row for that channel.
    pub fn job_id(channel_id: Uuid, slug: &str) -> Uuid {
        Uuid::new_v5(&channel_id, slug.as_bytes())
    }

    /// Compare content fields only; publish status and timestamps are ignored.
    pub fn same_content(&self, other: &Job) -> bool {
        self.id == other.id
            && self.channel_id == other.channel_id
            && self.status == other.status
            && self.url == other.url
            && self.title == other.title
            && self.description == other.description
            && self.source == other.source
            && self.location == other.location
            && self.remote == other.remote
            && self.posted_at == other.posted_at
    }

    pub fn mark_as_changed(&mut self) {
        self.status = JobStatus::Active;
        self.publish_status = PublishStatus::Unpublished;
        self.updated_at = Utc::now();
    }

    pub fn mark_as_missing(&mut self) {
        self.status = JobStatus::Inactive;
        self.publish_status = PublishStatus::Unpublished;
        self.updated_at = Utc::now();
    }

    pub fn mark_as_published(&mut self) {
        self.publish_status = PublishStatus::Published;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == JobStatus::Active
    }
}

/// Lifecycle of one import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Fetching,
    Processing,
    Publishing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Processing => "processing",
            Self::Publishing => "publishing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fetching" => Some(Self::Fetching),
            "processing" => Some(Self::Processing),
            "publishing" => Some(Self::Publishing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Allowed forward edges of the lifecycle graph
    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        use ImportStatus::*;

        matches!(
            (*self, next),
            (Pending, Fetching)
                | (Fetching, Processing)
                | (Processing, Publishing)
                | (Publishing, Completed)
                | (Pending | Fetching | Processing | Publishing, Failed)
        )
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected lifecycle edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ImportStatus,
    pub to: ImportStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid import transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Kind of fact recorded in the import metric ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    New,
    Updated,
    NoChange,
    Missing,
    Error,
    Publish,
    LatePublish,
    MissingPublish,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::NoChange => "no_change",
            Self::Missing => "missing",
            Self::Error => "error",
            Self::Publish => "publish",
            Self::LatePublish => "late_publish",
            Self::MissingPublish => "missing_publish",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "updated" => Some(Self::Updated),
            "no_change" => Some(Self::NoChange),
            "missing" => Some(Self::Missing),
            "error" => Some(Self::Error),
            "publish" => Some(Self::Publish),
            "late_publish" => Some(Self::LatePublish),
            "missing_publish" => Some(Self::MissingPublish),
            _ => None,
        }
    }
}

/// One append-only fact about a job in a given run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportMetric {
    pub id: Uuid,
    pub import_id: Uuid,
    pub job_id: Uuid,
    pub metric_type: MetricType,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImportMetric {
    pub fn new(import_id: Uuid, job_id: Uuid, metric_type: MetricType, error: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            import_id,
            job_id,
            metric_type,
            error,
            created_at: Utc::now(),
        }
    }
}

/// Counters derived from an import's metric rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub new: usize,
    pub updated: usize,
    pub no_change: usize,
    pub missing: usize,
    pub errors: usize,
    pub published: usize,
    pub late_published: usize,
    pub missing_published: usize,
    pub total: usize,
}

impl ImportSummary {
    pub fn from_metrics(metrics: &[ImportMetric]) -> Self {
        let mut summary = Self::default();
        for metric in metrics {
            match metric.metric_type {
                MetricType::New => summary.new += 1,
                MetricType::Updated => summary.updated += 1,
                MetricType::NoChange => summary.no_change += 1,
                MetricType::Missing => summary.missing += 1,
                MetricType::Error => summary.errors += 1,
                MetricType::Publish => summary.published += 1,
                MetricType::LatePublish => summary.late_published += 1,
                MetricType::MissingPublish => summary.missing_published += 1,
            }
        }
        summary.total =
            summary.new + summary.updated + summary.no_change + summary.missing + summary.errors;
        summary
    }
}

/// One fetch-reconcile-publish run for a channel.
///
/// Status, end time, error and metrics only change through
/// [`crate::importer::ImportService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub id: Uuid,
    pub channel_id: Uuid,
    status: ImportStatus,
    pub started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    error: Option<String>,
    metrics: Vec<ImportMetric>,
}

impl Import {
    /// Create a pending import starting now
    pub fn new(channel_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel_id,
            status: ImportStatus::Pending,
            started_at: Utc::now(),
            ended_at: None,
            error: None,
            metrics: Vec::new(),
        }
    }

    /// Rebuild an import from persisted columns
    pub fn from_parts(
        id: Uuid,
        channel_id: Uuid,
        status: ImportStatus,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        error: Option<String>,
    ) -> Self {
        Self {
            id,
            channel_id,
            status,
            started_at,
            ended_at,
            error,
            metrics: Vec::new(),
        }
    }

    pub fn status(&self) -> ImportStatus {
        self.status
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metrics(&self) -> &[ImportMetric] {
        &self.metrics
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary::from_metrics(&self.metrics)
    }

    pub(crate) fn transition(&mut self, to: ImportStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub(crate) fn finish(&mut self, error: Option<String>) {
        self.ended_at = Some(Utc::now());
        self.error = error;
    }

    pub(crate) fn set_metrics(&mut self, metrics: Vec<ImportMetric>) {
        self.metrics = metrics;
    }

    /// Attach metric rows loaded alongside the import
    pub fn with_metrics(mut self, metrics: Vec<ImportMetric>) -> Self {
        self.metrics = metrics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(channel_id: Uuid) -> Job {
        let now = Utc::now();
        Job {
            id: Job::job_id(channel_id, "backend-engineer-berlin-123"),
            channel_id,
            status: JobStatus::Active,
            publish_status: PublishStatus::Unpublished,
            url: "https://example.com/jobs/backend-engineer".to_string(),
            title: "Backend Engineer".to_string(),
            description: "Rust and Postgres".to_string(),
            source: "arbeitnow".to_string(),
            location: "Berlin".to_string(),
            remote: true,
            posted_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_job_id_is_deterministic() {
        let channel = Uuid::new_v4();
        assert_eq!(Job::job_id(channel, "slug-1"), Job::job_id(channel, "slug-1"));
        assert_ne!(Job::job_id(channel, "slug-1"), Job::job_id(channel, "slug-2"));
        assert_ne!(
            Job::job_id(channel, "slug-1"),
            Job::job_id(Uuid::new_v4(), "slug-1")
        );
    }

    #[test]
    fn test_same_content_ignores_publish_status_and_timestamps() {
        let job = sample_job(Uuid::new_v4());
        let mut other = job.clone();
        other.publish_status = PublishStatus::Published;
        other.created_at = other.created_at + chrono::Duration::hours(1);
        other.updated_at = other.updated_at + chrono::Duration::hours(2);
        assert!(job.same_content(&other));

        other.title = "Senior Backend Engineer".to_string();
        assert!(!job.same_content(&other));
    }

    #[test]
    fn test_mark_as_missing_and_changed() {
        let mut job = sample_job(Uuid::new_v4());
        job.publish_status = PublishStatus::Published;

        job.mark_as_missing();
        assert_eq!(job.status, JobStatus::Inactive);
        assert_eq!(job.publish_status, PublishStatus::Unpublished);

        job.mark_as_changed();
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.publish_status, PublishStatus::Unpublished);
    }

    #[test]
    fn test_import_status_transitions() {
        assert!(ImportStatus::Pending.can_transition_to(ImportStatus::Fetching));
        assert!(ImportStatus::Fetching.can_transition_to(ImportStatus::Failed));
        assert!(ImportStatus::Publishing.can_transition_to(ImportStatus::Completed));
        assert!(!ImportStatus::Pending.can_transition_to(ImportStatus::Completed));
        assert!(!ImportStatus::Processing.can_transition_to(ImportStatus::Fetching));
        assert!(!ImportStatus::Completed.can_transition_to(ImportStatus::Failed));
        assert!(!ImportStatus::Failed.can_transition_to(ImportStatus::Pending));
    }

    #[test]
    fn test_import_transition_rejects_backwards_edge() {
        let mut import = Import::new(Uuid::new_v4());
        import.transition(ImportStatus::Fetching).unwrap();
        let err = import.transition(ImportStatus::Pending).unwrap_err();
        assert_eq!(err.from, ImportStatus::Fetching);
        assert_eq!(import.status(), ImportStatus::Fetching);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            ImportStatus::Pending,
            ImportStatus::Fetching,
            ImportStatus::Processing,
            ImportStatus::Publishing,
            ImportStatus::Completed,
            ImportStatus::Failed,
        ] {
            assert_eq!(ImportStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MetricType::parse("late_publish"), Some(MetricType::LatePublish));
        assert_eq!(Integration::parse("ArbeitNow"), Some(Integration::Arbeitnow));
        assert_eq!(Integration::parse("linkedin"), None);
    }

    #[test]
    fn test_summary_counts_metric_rows() {
        let import_id = Uuid::new_v4();
        let metrics: Vec<ImportMetric> = [
            MetricType::New,
            MetricType::New,
            MetricType::Updated,
            MetricType::NoChange,
            MetricType::Missing,
            MetricType::Error,
            MetricType::Publish,
            MetricType::LatePublish,
        ]
        .into_iter()
        .map(|kind| ImportMetric::new(import_id, Uuid::new_v4(), kind, None))
        .collect();

        let summary = ImportSummary::from_metrics(&metrics);
        assert_eq!(summary.new, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.late_published, 1);
        assert_eq!(summary.total, 6);
    }
}
