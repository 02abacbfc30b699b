//! Command and event transport
//!
//! Import commands decouple scheduling from execution; job events tell
//! downstream consumers about new, changed and vanished postings. Messages
//! are JSON documents; [`redis::RedisQueue`] carries them over Redis lists.

pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Job;

pub use self::redis::RedisQueue;

/// Errors raised while publishing or consuming messages
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("failed to get redis connection: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis command failed: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// Publish did not finish before the deadline
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// Transport refused the message
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl QueueError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

/// "Run this import" command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCommand {
    pub import_id: Uuid,
}

/// Announcement of a new or changed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInformation {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub location: String,
    pub remote: bool,
    pub posted_at: DateTime<Utc>,
}

impl From<&Job> for JobInformation {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            channel_id: job.channel_id,
            title: job.title.clone(),
            description: job.description.clone(),
            url: job.url.clone(),
            source: job.source.clone(),
            location: job.location.clone(),
            remote: job.remote,
            posted_at: job.posted_at,
        }
    }
}

/// Announcement of a job that disappeared upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMissing {
    pub id: Uuid,
    pub channel_id: Uuid,
}

impl From<&Job> for JobMissing {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            channel_id: job.channel_id,
        }
    }
}

/// Envelope for everything on the job event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobInformation(JobInformation),
    JobMissing(JobMissing),
}

impl JobEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            Self::JobInformation(info) => info.id,
            Self::JobMissing(missing) => missing.id,
        }
    }
}

#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish_import_command(&self, import_id: Uuid) -> Result<(), QueueError>;
}

/// Source of raw import commands for the worker loop
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Pop the next command, waiting at most `wait`
    async fn next_command(&self, wait: Duration) -> Result<Option<String>, QueueError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_job_information(&self, job: &Job) -> Result<(), QueueError>;

    async fn publish_job_missing(&self, job: &Job) -> Result<(), QueueError>;
}

// ============================================================================
// Mock Implementations
// ============================================================================

/// Records import commands in memory
#[derive(Default)]
pub struct MockCommandPublisher {
    published: RwLock<Vec<Uuid>>,
    fail: AtomicBool,
}

impl MockCommandPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Uuid> {
        self.published.read().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CommandPublisher for MockCommandPublisher {
    async fn publish_import_command(&self, import_id: Uuid) -> Result<(), QueueError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueueError::Rejected(format!("import command {import_id}")));
        }
        self.published.write().unwrap().push(import_id);
        Ok(())
    }
}

/// Records job events in memory
#[derive(Default)]
pub struct MockEventPublisher {
    events: RwLock<Vec<JobEvent>>,
    failing_jobs: RwLock<HashSet<Uuid>>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.read().unwrap().clone()
    }

    /// Reject every event for the given job
    pub fn fail_for(&self, job_id: Uuid) {
        self.failing_jobs.write().unwrap().insert(job_id);
    }

    fn record(&self, event: JobEvent) -> Result<(), QueueError> {
        if self.failing_jobs.read().unwrap().contains(&event.job_id()) {
            return Err(QueueError::Rejected(format!("event for job {}", event.job_id())));
        }
        self.events.write().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish_job_information(&self, job: &Job) -> Result<(), QueueError> {
        self.record(JobEvent::JobInformation(JobInformation::from(job)))
    }

    async fn publish_job_missing(&self, job: &Job) -> Result<(), QueueError> {
        self.record(JobEvent::JobMissing(JobMissing::from(job)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_command_wire_format() {
        let id = Uuid::nil();
        let json = serde_json::to_string(&ImportCommand { import_id: id }).unwrap();
        assert_eq!(json, r#"{"import_id":"00000000-0000-0000-0000-000000000000"}"#);
    }

    #[test]
    fn test_job_event_is_tagged() {
        let event = JobEvent::JobMissing(JobMissing {
            id: Uuid::nil(),
            channel_id: Uuid::nil(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "job_missing");
        assert_eq!(event.job_id(), Uuid::nil());
    }

    #[tokio::test]
    async fn test_mock_command_publisher_failure() {
        let publisher = MockCommandPublisher::new();
        publisher.set_fail(true);
        assert!(publisher.publish_import_command(Uuid::new_v4()).await.is_err());
        assert!(publisher.published().is_empty());
    }
}
