//! Contract Test: Reconciliation Pipeline
//!
//! This test verifies the end-to-end behavior of one region run.
//!
//! Constraints verified:
//! - First observation of a monitored snapshot publishes and persists it
//! - An unchanged world publishes and persists nothing
//! - Large change sets are persisted in chunks of at most 25 records
//! - Re-running against the persisted result never re-alerts
//! - Only snapshots newer than the cutoff are considered
//!
//! If this test fails, duplicate or missing alerts will reach operators.

mod common;

use chrono::{Duration, Utc};
use common::*;
use snapmon_core::MonitorEvent;
use snapmon_core::snapshot::{SnapshotInfo, SnapshotKind};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn new_snapshot_is_published_and_persisted() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript::instances(vec![instance("snap-1", "available", now)]),
    );
    let harness = Harness::new(listers);
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]));

    let report = monitor.run_at(now, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].changes, 1);
    assert_eq!(report.completed[0].records_written, 1);

    let published = harness.notifier.published();
    assert_eq!(published.len(), 1, "publisher invoked exactly once");
    assert_eq!(published[0].0, TOPIC);
    assert!(published[0].1.contains("New snapshot - Status: available"));
    assert!(published[0].1.contains("Region: us-west-2"));
    assert!(published[0].1.starts_with("RDS Snapshot Status Update Summary (1 changes)"));

    let batches = harness.store.batches();
    assert_eq!(batches.len(), 1, "writer invoked exactly once");
    assert_eq!(batches[0].region, "us-west-2");
    assert_eq!(batches[0].identifiers, vec!["snap-1".to_string()]);
    assert_eq!(batches[0].expires_at, now + Duration::days(7));
}

#[tokio::test]
async fn unchanged_snapshot_is_silent() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript::instances(vec![instance("snap-1", "available", now)]),
    );
    let harness = Harness::new(listers);
    harness
        .store
        .seed(
            "us-west-2",
            &[SnapshotInfo::new("snap-1", SnapshotKind::Instance, now, "available")],
            now + Duration::days(7),
        )
        .await;
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]));

    let report = monitor.run_at(now, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.total_changes(), 0);
    assert!(harness.notifier.published().is_empty(), "publisher not invoked");
    assert!(harness.store.batches().is_empty(), "writer not invoked");
}

#[tokio::test]
async fn thirty_changes_are_written_as_two_batches() {
    let now = Utc::now();
    let snapshots: Vec<_> = (0..30)
        .map(|i| instance(&format!("snap-{:02}", i), "available", now))
        .collect();
    let listers = ScriptedListerFactory::new()
        .with_region("us-west-2", RegionScript::instances(snapshots));
    let harness = Harness::new(listers);
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]));

    let report = monitor.run_at(now, &CancellationToken::new()).await.unwrap();
    assert_eq!(report.completed[0].batches, 2);

    let batches = harness.store.batches();
    let sizes: Vec<_> = batches.iter().map(|b| b.identifiers.len()).collect();
    assert_eq!(sizes, vec![25, 5]);

    let written: Vec<_> = batches.iter().flat_map(|b| b.identifiers.clone()).collect();
    let unique: HashSet<_> = written.iter().cloned().collect();
    assert_eq!(written.len(), 30);
    assert_eq!(unique.len(), 30, "every identifier written exactly once");

    // One digest for the whole region, not one per batch
    assert_eq!(harness.notifier.published().len(), 1);
}

#[tokio::test]
async fn second_run_over_same_world_does_not_realert() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript::instances(vec![
            instance("snap-1", "available", now),
            instance("snap-2", "failed", now),
            instance("snap-3", "creating", now),
        ]),
    );
    let harness = Harness::new(listers);
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]));
    let cancel = CancellationToken::new();

    let first = monitor.run_at(now, &cancel).await.unwrap();
    assert_eq!(first.total_changes(), 2, "creating is not a monitored status");

    let second = monitor.run_at(now + Duration::minutes(10), &cancel).await.unwrap();
    assert_eq!(second.total_changes(), 0);
    assert_eq!(harness.notifier.published().len(), 1);
    assert_eq!(harness.store.batches().len(), 1);
}

#[tokio::test]
async fn status_transition_reports_previous_status() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript::instances(vec![instance("snap-1", "creating", now)]),
    );
    let harness = Harness::new(listers);
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]).with_statuses(["creating", "available"]));
    let cancel = CancellationToken::new();

    monitor.run_at(now, &cancel).await.unwrap();

    harness.listers.set_region(
        "us-west-2",
        RegionScript::instances(vec![instance("snap-1", "available", now)]),
    );
    monitor.run_at(now + Duration::minutes(10), &cancel).await.unwrap();

    let published = harness.notifier.published();
    assert_eq!(published.len(), 2);
    assert!(published[1].1.contains("Status changed from creating to available"));
    assert_eq!(
        harness.store.status_of("us-west-2", "snap-1").await.as_deref(),
        Some("available")
    );
}

#[tokio::test]
async fn snapshots_older_than_cutoff_are_ignored() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript {
            instance_pages: vec![vec![
                instance("old", "failed", now - Duration::days(8)),
                instance("edge", "failed", now - Duration::days(7)),
                instance("recent", "failed", now - Duration::days(6)),
            ]],
            cluster_pages: vec![vec![cluster("cluster-snap", "available", now - Duration::hours(1))]],
            ..Default::default()
        },
    );
    let harness = Harness::new(listers);
    let (monitor, mut rx) = harness.monitor(config(&["us-west-2"]));

    monitor.run_at(now, &CancellationToken::new()).await.unwrap();

    let batches = harness.store.batches();
    assert_eq!(
        batches[0].identifiers,
        vec!["recent".to_string(), "cluster-snap".to_string()],
        "instances first, then clusters; cutoff is exclusive"
    );

    let events = drain_events(&mut rx);
    assert!(events.contains(&MonitorEvent::SnapshotsCollected {
        region: "us-west-2".to_string(),
        instances: 1,
        clusters: 1,
    }));
}

#[tokio::test]
async fn paged_listing_is_fully_drained() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript {
            instance_pages: vec![
                vec![instance("a", "available", now)],
                vec![],
                vec![instance("b", "available", now), instance("c", "failed", now)],
            ],
            ..Default::default()
        },
    );
    let harness = Harness::new(listers);
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]));

    let report = monitor.run_at(now, &CancellationToken::new()).await.unwrap();

    assert_eq!(harness.listers.instance_calls(), 3);
    assert_eq!(report.total_changes(), 3);
}

#[tokio::test]
async fn events_follow_pipeline_order() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript::instances(vec![instance("snap-1", "available", now)]),
    );
    let harness = Harness::new(listers);
    let (monitor, mut rx) = harness.monitor(config(&["us-west-2"]));

    monitor.run_at(now, &CancellationToken::new()).await.unwrap();

    let region = "us-west-2".to_string();
    let events = drain_events(&mut rx);
    assert_eq!(
        events,
        vec![
            MonitorEvent::RunStarted { regions_count: 1 },
            MonitorEvent::RegionStarted { region: region.clone() },
            MonitorEvent::SnapshotsCollected {
                region: region.clone(),
                instances: 1,
                clusters: 0,
            },
            MonitorEvent::BaselineLoaded {
                region: region.clone(),
                entries: 0,
            },
            MonitorEvent::ChangesDetected {
                region: region.clone(),
                changes: 1,
            },
            MonitorEvent::DigestPublished {
                region: region.clone(),
                changes: 1,
            },
            MonitorEvent::StateWritten {
                region: region.clone(),
                records: 1,
                batches: 1,
            },
            MonitorEvent::RegionCompleted { region, changes: 1 },
            MonitorEvent::RunCompleted {
                succeeded: 1,
                failed: 0,
            },
        ]
    );
}

#[tokio::test]
async fn shared_identifier_is_written_once_and_settles() {
    let now = Utc::now();
    let listers = ScriptedListerFactory::new().with_region(
        "us-west-2",
        RegionScript {
            instance_pages: vec![vec![instance("nightly", "available", now)]],
            cluster_pages: vec![vec![cluster("nightly", "failed", now)]],
            ..Default::default()
        },
    );
    let harness = Harness::new(listers);
    let (monitor, _rx) = harness.monitor(config(&["us-west-2"]));

    let first = monitor.run_at(now, &CancellationToken::new()).await.unwrap();
    assert_eq!(first.total_changes(), 1);

    let batches = harness.store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].identifiers, vec!["nightly".to_string()]);
    assert_eq!(
        harness.store.status_of("us-west-2", "nightly").await.as_deref(),
        Some("failed")
    );

    let second = monitor.run_at(now, &CancellationToken::new()).await.unwrap();
    assert_eq!(second.total_changes(), 0);
    assert_eq!(harness.notifier.published().len(), 1, "no re-alert");
    assert_eq!(harness.store.batches().len(), 1);
}
