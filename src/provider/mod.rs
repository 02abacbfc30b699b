//! Per-integration job providers
//!
//! A [`Provider`] fetches the full current listing of one channel. The
//! [`ProviderFactory`] picks the implementation from the channel's
//! integration, so adding an integration never touches the import runner.

pub mod arbeitnow;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::models::{Channel, Integration, Job};

pub use arbeitnow::ArbeitnowProvider;

/// Errors raised while fetching a channel snapshot
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A page could not be fetched; no partial result is returned
    #[error("failed to get jobs page {page} on channel {channel_id}: {source}")]
    Page {
        page: usize,
        channel_id: Uuid,
        #[source]
        source: Box<ProviderError>,
    },

    /// Transport failure
    #[error("failed to get job board: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-200 response with a body
    #[error("failed to request with http code {code} and body: {body}")]
    Status { code: u16, body: String },

    /// Non-200 response without a body
    #[error("failed to request with http code {code} and no body")]
    EmptyStatus { code: u16 },

    /// Body is not a job board response
    #[error("failed to decode response body: {reason}: {body}")]
    Decode { reason: String, body: String },

    /// No provider exists for the integration
    #[error("integration {0} is not supported")]
    Unsupported(String),

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl ProviderError {
    /// Page number the fetch failed on, if any
    pub fn page(&self) -> Option<usize> {
        match self {
            Self::Page { page, .. } => Some(*page),
            _ => None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Page { source, .. } => source.is_recoverable(),
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Status { code, .. } | Self::EmptyStatus { code } => *code >= 500 || *code == 429,
            Self::Decode { .. } | Self::Unsupported(_) | Self::Client(_) => false,
        }
    }
}

/// Fetches one channel's full job snapshot
#[async_trait]
pub trait Provider: Send + Sync {
    /// Channel this provider serves
    fn channel(&self) -> &Channel;

    /// Fetch every page and map entries to canonical jobs
    async fn get_jobs(&self) -> Result<Vec<Job>, ProviderError>;
}

/// Builds the provider matching a channel's integration
pub trait ProviderFactory: Send + Sync {
    fn create(&self, channel: Channel) -> Result<Box<dyn Provider>, ProviderError>;
}

/// Factory backed by a shared HTTP client
pub struct HttpProviderFactory {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpProviderFactory {
    pub fn new(config: &GatewayConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, channel: Channel) -> Result<Box<dyn Provider>, ProviderError> {
        match channel.integration {
            Integration::Arbeitnow => Ok(Box::new(ArbeitnowProvider::new(
                self.client.clone(),
                &self.config.arbeitnow_url,
                channel,
            ))),
        }
    }
}

/// Provider returning a fixed snapshot or a fixed failure
pub struct MockProvider {
    channel: Channel,
    jobs: Vec<Job>,
    failure: Option<(usize, String)>,
}

impl MockProvider {
    pub fn new(channel: Channel, jobs: Vec<Job>) -> Self {
        Self {
            channel,
            jobs,
            failure: None,
        }
    }

    /// Fail as if the given page returned a server error
    pub fn failing_on_page(channel: Channel, page: usize, body: impl Into<String>) -> Self {
        Self {
            channel,
            jobs: Vec::new(),
            failure: Some((page, body.into())),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn channel(&self) -> &Channel {
        &self.channel
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, ProviderError> {
        match &self.failure {
            Some((page, body)) => Err(ProviderError::Page {
                page: *page,
                channel_id: self.channel.id,
                source: Box::new(ProviderError::Status {
                    code: 500,
                    body: body.clone(),
                }),
            }),
            None => Ok(self.jobs.clone()),
        }
    }
}

/// Factory serving canned snapshots per channel id
#[derive(Default)]
pub struct MockProviderFactory {
    snapshots: RwLock<HashMap<Uuid, Vec<Job>>>,
    unsupported: RwLock<Vec<Uuid>>,
}

impl MockProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(&self, channel_id: Uuid, jobs: Vec<Job>) {
        self.snapshots.write().unwrap().insert(channel_id, jobs);
    }

    /// Refuse to build a provider for the channel
    pub fn reject(&self, channel_id: Uuid) {
        self.unsupported.write().unwrap().push(channel_id);
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(&self, channel: Channel) -> Result<Box<dyn Provider>, ProviderError> {
        if self.unsupported.read().unwrap().contains(&channel.id) {
            return Err(ProviderError::Unsupported(channel.integration.to_string()));
        }
        let jobs = self
            .snapshots
            .read()
            .unwrap()
            .get(&channel.id)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(MockProvider::new(channel, jobs)))
    }
}
