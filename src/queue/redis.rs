//! Redis list transport
//!
//! Commands go to `<prefix>:commands:import` and job events to
//! `<prefix>:events:jobs`. Producers `RPUSH`, the worker loop `BLPOP`s, so
//! a popped command is acknowledged as soon as it is received.

use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use super::{
    CommandPublisher, CommandSource, EventPublisher, ImportCommand, JobEvent, JobInformation,
    JobMissing, QueueError,
};
use crate::config::QueueConfig;
use crate::models::Job;

/// Redis-backed command and event queue
#[derive(Clone)]
pub struct RedisQueue {
    pool: Pool,
    commands_key: String,
    events_key: String,
    publish_timeout: Duration,
}

impl RedisQueue {
    /// Create the pool and check the server answers
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        let pool_config = PoolConfig::from_url(&config.redis_url);
        let pool = pool_config
            .builder()
            .map_err(|e| anyhow::anyhow!("Failed to create pool builder: {e}"))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .context("Failed to create Redis connection pool")?;

        let mut conn = pool.get().await.context("Failed to get Redis connection")?;
        let _: String = ::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("Failed to ping Redis")?;

        tracing::info!(url = %config.redis_url, prefix = %config.key_prefix, "Connected to Redis queue");

        Ok(Self {
            pool,
            commands_key: commands_key(&config.key_prefix),
            events_key: events_key(&config.key_prefix),
            publish_timeout: Duration::from_secs(config.publish_timeout_secs),
        })
    }

    async fn push<T: Serialize + Sync>(&self, key: &str, message: &T) -> Result<(), QueueError> {
        let payload = serde_json::to_string(message)?;

        let push = async {
            let mut conn = self.pool.get().await?;
            let _: i64 = ::redis::cmd("RPUSH")
                .arg(key)
                .arg(&payload)
                .query_async(&mut *conn)
                .await?;
            Ok::<(), QueueError>(())
        };

        tokio::time::timeout(self.publish_timeout, push)
            .await
            .map_err(|_| QueueError::Timeout(self.publish_timeout))?
    }
}

#[async_trait]
impl CommandSource for RedisQueue {
    async fn next_command(&self, wait: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.pool.get().await?;
        let popped: Option<(String, String)> = ::redis::cmd("BLPOP")
            .arg(&self.commands_key)
            .arg(wait.as_secs().max(1))
            .query_async(&mut *conn)
            .await?;

        Ok(popped.map(|(_, payload)| payload))
    }
}

#[async_trait]
impl CommandPublisher for RedisQueue {
    async fn publish_import_command(&self, import_id: Uuid) -> Result<(), QueueError> {
        self.push(&self.commands_key, &ImportCommand { import_id })
            .await
    }
}

#[async_trait]
impl EventPublisher for RedisQueue {
    async fn publish_job_information(&self, job: &Job) -> Result<(), QueueError> {
        let event = JobEvent::JobInformation(JobInformation::from(job));
        self.push(&self.events_key, &event).await
    }

    async fn publish_job_missing(&self, job: &Job) -> Result<(), QueueError> {
        let event = JobEvent::JobMissing(JobMissing::from(job));
        self.push(&self.events_key, &event).await
    }
}

fn commands_key(prefix: &str) -> String {
    format!("{prefix}:commands:import")
}

fn events_key(prefix: &str) -> String {
    format!("{prefix}:events:jobs")
}
