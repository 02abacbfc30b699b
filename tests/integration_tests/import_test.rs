//! Full import runs against a mock Arbeitnow board

use std::sync::Arc;

use jobsync::config::{Config, GatewayConfig};
use jobsync::importer::{
    ImportAction, ImportError, ImportRunner, ImportService, JobSyncer, PublishingStage,
};
use jobsync::models::{ImportStatus, Job, PublishStatus};
use jobsync::provider::HttpProviderFactory;
use wiremock::MockServer;

use super::fixtures;
use crate::common::TestEngine;

/// Same engine, but importing from a real HTTP provider pointed at `base_url`
fn http_action(engine: &TestEngine, base_url: &str) -> ImportAction {
    let config = Config::default();
    let gateway = GatewayConfig {
        arbeitnow_url: base_url.to_string(),
        request_timeout_secs: 5,
        user_agent: "jobsync-test".to_string(),
    };
    let runner = ImportRunner::new(
        JobSyncer::new(engine.jobs.clone(), 2, 4),
        engine.lifecycle.clone(),
        PublishingStage::new(
            engine.jobs.clone(),
            engine.events.clone(),
            engine.lifecycle.clone(),
            true,
        ),
        &config.import,
    );
    ImportAction::new(
        engine.channels.clone(),
        Arc::new(HttpProviderFactory::new(&gateway).unwrap()),
        runner,
    )
}

#[tokio::test]
async fn test_fetch_failure_on_page_two_fails_the_import() {
    let server = MockServer::start().await;
    fixtures::mount_board_failing_on_page_two(&server).await;

    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let action = http_action(&engine, &server.uri());
    let import = engine.lifecycle.start(channel.id).await.unwrap();

    let err = action.execute(import.id).await.unwrap_err();
    assert!(matches!(err, ImportError::Fetch { .. }));

    let stored = engine.lifecycle.find(import.id).await.unwrap();
    assert_eq!(stored.status(), ImportStatus::Failed);
    assert!(stored.ended_at().is_some());
    assert!(stored.error().unwrap().contains("page 2"));

    assert!(engine.jobs.all().is_empty());
    assert!(engine.jobs.save_calls().is_empty());
    assert!(engine.events.events().is_empty());
    assert_eq!(
        engine.imports.status_history(import.id),
        vec![ImportStatus::Pending, ImportStatus::Fetching, ImportStatus::Failed]
    );
}

#[tokio::test]
async fn test_successful_http_import() {
    let server = MockServer::start().await;
    fixtures::mount_board(&server, &["rust-dev", "go-dev", "sre"]).await;

    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let action = http_action(&engine, &server.uri());
    let import = engine.lifecycle.start(channel.id).await.unwrap();

    let import = action.execute(import.id).await.unwrap();

    assert_eq!(import.status(), ImportStatus::Completed);
    assert_eq!(import.summary().new, 3);
    assert_eq!(import.summary().published, 3);
    assert_eq!(
        engine.imports.status_history(import.id),
        vec![
            ImportStatus::Pending,
            ImportStatus::Fetching,
            ImportStatus::Processing,
            ImportStatus::Publishing,
            ImportStatus::Completed,
        ]
    );

    let job = engine.jobs.get(Job::job_id(channel.id, "rust-dev")).unwrap();
    assert_eq!(job.publish_status, PublishStatus::Published);
    assert_eq!(job.source, "arbeitnow");
}

#[tokio::test]
async fn test_second_run_reports_no_change() {
    let server = MockServer::start().await;
    fixtures::mount_board(&server, &["rust-dev", "sre"]).await;

    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let action = http_action(&engine, &server.uri());

    let first = engine.lifecycle.start(channel.id).await.unwrap();
    action.execute(first.id).await.unwrap();

    let second = engine.lifecycle.start(channel.id).await.unwrap();
    let second = action.execute(second.id).await.unwrap();

    let summary = second.summary();
    assert_eq!(summary.new, 0);
    assert_eq!(summary.no_change, 2);
    assert_eq!(summary.published, 0);
    assert_eq!(engine.events.events().len(), 2);
}

#[tokio::test]
async fn test_imports_are_listed_most_recent_first() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let service = ImportService::new(engine.imports.clone());

    let older = service.start(channel.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = service.start(channel.id).await.unwrap();

    let listed: Vec<_> = service.list().await.unwrap().into_iter().map(|i| i.id).collect();
    assert_eq!(listed, vec![newer.id, older.id]);
}
