//! Reconciliation scenarios against the in-memory job repository

use std::collections::HashMap;

use jobsync::importer::{Decision, DecisionKind, JobSyncer, SyncError};
use jobsync::models::{ImportStatus, JobStatus, PublishStatus};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::{self, TestEngine};

#[tokio::test]
async fn test_new_unchanged_updated_and_missing() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();

    let a = common::create_test_job(channel.id, "a");
    let b = common::create_test_job(channel.id, "b");
    let c = common::create_test_job(channel.id, "c");
    let d = common::create_test_job(channel.id, "d");

    let mut stored_c = c.clone();
    stored_c.title = "Old title".to_string();
    engine.jobs.insert(b.clone());
    engine.jobs.insert(stored_c);
    engine.jobs.insert(d.clone());

    let syncer = JobSyncer::new(engine.jobs.clone(), 2, 2);
    let (tx, mut rx) = mpsc::channel::<Decision>(16);
    let collector = tokio::spawn(async move {
        let mut decisions = HashMap::new();
        while let Some(decision) = rx.recv().await {
            decisions.insert(decision.job_id, decision.kind);
        }
        decisions
    });

    syncer
        .sync(channel.id, vec![a.clone(), b.clone(), c.clone()], &tx)
        .await
        .unwrap();
    drop(tx);
    let decisions = collector.await.unwrap();

    assert_eq!(decisions.len(), 4);
    assert_eq!(decisions[&a.id], DecisionKind::New);
    assert_eq!(decisions[&b.id], DecisionKind::NoChange);
    assert_eq!(decisions[&c.id], DecisionKind::Updated);
    assert_eq!(decisions[&d.id], DecisionKind::Missing);

    for id in [a.id, b.id, c.id] {
        assert_eq!(engine.jobs.get(id).unwrap().status, JobStatus::Active);
    }
    assert_eq!(engine.jobs.get(c.id).unwrap().title, c.title);
    assert_eq!(engine.jobs.get(d.id).unwrap().status, JobStatus::Inactive);
    assert!(!engine.jobs.save_calls().contains(&b.id));
}

#[tokio::test]
async fn test_full_run_records_every_decision() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();

    let a = common::create_test_job(channel.id, "a");
    let mut b = common::create_test_job(channel.id, "b");
    b.mark_as_published();
    let d = common::create_test_job(channel.id, "d");
    engine.jobs.insert(b.clone());
    engine.jobs.insert(d.clone());
    engine.providers.with_snapshot(channel.id, vec![a.clone(), b.clone()]);

    let import = engine.lifecycle.start(channel.id).await.unwrap();
    let import = engine.action.execute(import.id).await.unwrap();

    let summary = import.summary();
    assert_eq!(import.status(), ImportStatus::Completed);
    assert_eq!(summary.new, 1);
    assert_eq!(summary.no_change, 1);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.published, 1);
    assert_eq!(summary.missing_published, 1);

    let missing = engine.jobs.get(d.id).unwrap();
    assert_eq!(missing.status, JobStatus::Inactive);
    assert_eq!(missing.publish_status, PublishStatus::Unpublished);
}

#[tokio::test]
async fn test_failed_save_is_reported_and_others_continue() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let ok = common::create_test_job(channel.id, "ok");
    let broken = common::create_test_job(channel.id, "broken");
    engine.jobs.fail_save_for(broken.id);

    let syncer = JobSyncer::new(engine.jobs.clone(), 3, 1);
    let (tx, mut rx) = mpsc::channel::<Decision>(16);
    let collector = tokio::spawn(async move {
        let mut kinds = Vec::new();
        while let Some(decision) = rx.recv().await {
            kinds.push((decision.job_id, decision.kind, decision.error));
        }
        kinds
    });

    let err = syncer
        .sync(channel.id, vec![ok.clone(), broken.clone()], &tx)
        .await
        .unwrap_err();
    drop(tx);
    let kinds = collector.await.unwrap();

    let SyncError::Save { failures } = &err else {
        panic!("expected save failures, got {err}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].job_id, broken.id);

    assert!(engine.jobs.get(ok.id).is_some());
    assert!(kinds
        .iter()
        .any(|(id, kind, error)| *id == broken.id && *kind == DecisionKind::Error && error.is_some()));
}

#[tokio::test]
async fn test_sync_failure_leaves_import_processing() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let broken = common::create_test_job(channel.id, "broken");
    engine.jobs.fail_save_for(broken.id);
    engine.providers.with_snapshot(channel.id, vec![broken]);

    let import = engine.lifecycle.start(channel.id).await.unwrap();
    assert!(engine.action.execute(import.id).await.is_err());

    let stored = engine.lifecycle.find(import.id).await.unwrap();
    assert_eq!(stored.status(), ImportStatus::Processing);
    assert!(stored.ended_at().is_none());
    assert!(engine.events.events().is_empty());
}

#[tokio::test]
async fn test_other_channels_are_untouched() {
    let engine = TestEngine::new();
    let channel = engine.add_channel();
    let other = common::create_test_job(Uuid::new_v4(), "elsewhere");
    engine.jobs.insert(other.clone());

    let import = engine.lifecycle.start(channel.id).await.unwrap();
    engine.action.execute(import.id).await.unwrap();

    assert_eq!(engine.jobs.get(other.id).unwrap().status, JobStatus::Active);
}
