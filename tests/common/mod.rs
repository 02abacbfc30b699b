//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use jobsync::config::Config;
use jobsync::importer::{ImportAction, ImportRunner, ImportService, JobSyncer, PublishingStage};
use jobsync::models::{Channel, Integration, Job, JobStatus, PublishStatus};
use jobsync::provider::MockProviderFactory;
use jobsync::queue::{MockCommandPublisher, MockEventPublisher};
use jobsync::scheduler::Scheduler;
use jobsync::storage::{MockChannelRepository, MockImportRepository, MockJobRepository};
use uuid::Uuid;

/// Create an active Arbeitnow channel
pub fn create_test_channel() -> Channel {
    Channel::new("arbeitnow", Integration::Arbeitnow)
}

/// Create an active, unpublished job for a channel
pub fn create_test_job(channel_id: Uuid, slug: &str) -> Job {
    let posted = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Job {
        id: Job::job_id(channel_id, slug),
        channel_id,
        status: JobStatus::Active,
        publish_status: PublishStatus::Unpublished,
        url: format!("https://www.arbeitnow.com/jobs/{slug}"),
        title: format!("Job {slug}"),
        description: "Build reliable services".to_string(),
        source: "arbeitnow".to_string(),
        location: "Berlin".to_string(),
        remote: false,
        posted_at: posted,
        created_at: posted,
        updated_at: posted,
    }
}

/// Every component wired over in-memory mocks
pub struct TestEngine {
    pub channels: Arc<MockChannelRepository>,
    pub jobs: Arc<MockJobRepository>,
    pub imports: Arc<MockImportRepository>,
    pub commands: Arc<MockCommandPublisher>,
    pub events: Arc<MockEventPublisher>,
    pub providers: Arc<MockProviderFactory>,
    pub lifecycle: ImportService,
    pub scheduler: Scheduler,
    pub action: ImportAction,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let channels = Arc::new(MockChannelRepository::new());
        let jobs = Arc::new(MockJobRepository::new());
        let imports = Arc::new(MockImportRepository::new());
        let commands = Arc::new(MockCommandPublisher::new());
        let events = Arc::new(MockEventPublisher::new());
        let providers = Arc::new(MockProviderFactory::new());

        let lifecycle = ImportService::new(imports.clone());
        let scheduler = Scheduler::new(channels.clone(), lifecycle.clone(), commands.clone());
        let runner = ImportRunner::new(
            JobSyncer::new(jobs.clone(), config.import.job_workers, config.import.job_buffer),
            lifecycle.clone(),
            PublishingStage::new(
                jobs.clone(),
                events.clone(),
                lifecycle.clone(),
                config.import.announce_missing,
            ),
            &config.import,
        );
        let action = ImportAction::new(channels.clone(), providers.clone(), runner);

        Self {
            channels,
            jobs,
            imports,
            commands,
            events,
            providers,
            lifecycle,
            scheduler,
            action,
        }
    }

    /// Register a channel and hand back a copy
    pub fn add_channel(&self) -> Channel {
        let channel = create_test_channel();
        self.channels.insert(channel.clone());
        channel
    }
}
