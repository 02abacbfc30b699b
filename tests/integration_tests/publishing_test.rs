//! Publishing stage behaviour seen from outside the crate

use std::collections::HashSet;

use jobsync::models::{Import, JobStatus, PublishStatus};
use jobsync::queue::JobEvent;

use super::fixtures::LogCapture;
use crate::common::{self, TestEngine};

#[tokio::test]
async fn test_publishes_changed_jobs_and_logs_count() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let a = common::create_test_job(channel.id, "a");
    let b = common::create_test_job(channel.id, "b");
    engine.jobs.insert(a.clone());
    engine.jobs.insert(b.clone());

    let import = Import::new(channel.id);
    let stage = jobsync::importer::PublishingStage::new(
        engine.jobs.clone(),
        engine.events.clone(),
        engine.lifecycle.clone(),
        false,
    );

    let logs = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let changed: HashSet<_> = [a.id, b.id].into_iter().collect();
    let report = stage.publish(&import, &changed, &[]).await.unwrap();

    assert_eq!(report.published, 2);
    assert_eq!(report.late_published, 0);
    assert_eq!(engine.events.events().len(), 2);
    for id in [a.id, b.id] {
        assert_eq!(engine.jobs.get(id).unwrap().publish_status, PublishStatus::Published);
    }
    assert!(logs
        .contents()
        .contains(&format!("published 2 jobs for import {}", import.id)));
}

#[tokio::test]
async fn test_inactive_and_published_jobs_are_not_candidates() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();

    let mut gone = common::create_test_job(channel.id, "gone");
    gone.status = JobStatus::Inactive;
    let mut done = common::create_test_job(channel.id, "done");
    done.mark_as_published();
    let fresh = common::create_test_job(channel.id, "fresh");
    for job in [&gone, &done, &fresh] {
        engine.jobs.insert(job.clone());
    }
    engine.providers.with_snapshot(channel.id, vec![done.clone(), fresh.clone()]);

    let import = engine.lifecycle.start(channel.id).await.unwrap();
    let import = engine.action.execute(import.id).await.unwrap();

    let info: Vec<_> = engine
        .events
        .events()
        .into_iter()
        .filter(|event| matches!(event, JobEvent::JobInformation(_)))
        .map(|event| event.job_id())
        .collect();
    assert_eq!(info, vec![fresh.id]);
    assert_eq!(import.summary().late_published, 1);
    assert_eq!(engine.jobs.get(gone.id).unwrap().publish_status, PublishStatus::Unpublished);
}

#[tokio::test]
async fn test_event_failure_keeps_job_unpublished_for_next_run() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let job = common::create_test_job(channel.id, "flaky");
    engine.providers.with_snapshot(channel.id, vec![job.clone()]);
    engine.events.fail_for(job.id);

    let first = engine.lifecycle.start(channel.id).await.unwrap();
    let first = engine.action.execute(first.id).await.unwrap();
    assert_eq!(first.summary().published, 0);
    assert_eq!(engine.jobs.get(job.id).unwrap().publish_status, PublishStatus::Unpublished);

    assert!(engine.events.events().is_empty());

    let second = engine.lifecycle.start(channel.id).await.unwrap();
    let second = engine.action.execute(second.id).await.unwrap();
    assert_eq!(second.summary().no_change, 1);
    assert_eq!(second.summary().late_published, 0);
}
