//! Test doubles and common utilities for contract tests
//!
//! This module provides scripted collaborators that record every call, so
//! tests can assert on what the monitor did and in which order.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snapmon_core::config::{EngineConfig, MonitorConfig, StateStoreConfig};
use snapmon_core::error::{Error, Result};
use snapmon_core::snapshot::{ClusterSnapshot, InstanceSnapshot, SnapshotInfo};
use snapmon_core::state::MemoryStateStore;
use snapmon_core::traits::{
    Notifier, Page, SnapshotLister, SnapshotListerFactory, StateEntry, StateReader, StateWriter,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub const TOPIC: &str = "arn:aws:sns:us-west-2:123456789012:snapshot-status";

/// Build an instance snapshot as a listing collaborator would return it
pub fn instance(id: &str, status: &str, created_at: DateTime<Utc>) -> InstanceSnapshot {
    InstanceSnapshot {
        identifier: Some(id.to_string()),
        instance_identifier: Some(format!("db-{}", id)),
        created_at: Some(created_at),
        status: Some(status.to_string()),
    }
}

/// Build a cluster snapshot as a listing collaborator would return it
pub fn cluster(id: &str, status: &str, created_at: DateTime<Utc>) -> ClusterSnapshot {
    ClusterSnapshot {
        identifier: Some(id.to_string()),
        cluster_identifier: Some(format!("cluster-{}", id)),
        created_at: Some(created_at),
        status: Some(status.to_string()),
    }
}

/// Monitor configuration with memory state and defaults elsewhere
pub fn config(regions: &[&str]) -> MonitorConfig {
    MonitorConfig::new(regions.iter().map(|r| r.to_string()).collect(), TOPIC)
        .with_state_store(StateStoreConfig::Memory)
}

/// Same as [`config`] with a custom engine section
pub fn config_with_engine(regions: &[&str], engine: EngineConfig) -> MonitorConfig {
    config(regions).with_engine(engine)
}

/// Scripted listing for one region
#[derive(Debug, Clone, Default)]
pub struct RegionScript {
    /// Instance snapshot pages, served in order
    pub instance_pages: Vec<Vec<InstanceSnapshot>>,
    /// Cluster snapshot pages, served in order
    pub cluster_pages: Vec<Vec<ClusterSnapshot>>,
    /// Fail the instance page with this index
    pub fail_instance_page: Option<usize>,
    /// Fail lister creation for the region
    pub fail_create: bool,
    /// Cancel this token while serving the instance page with the given index
    pub cancel_on_instance_page: Option<(usize, CancellationToken)>,
}

impl RegionScript {
    /// One page of instance snapshots, no clusters
    pub fn instances(items: Vec<InstanceSnapshot>) -> Self {
        Self {
            instance_pages: vec![items],
            ..Default::default()
        }
    }
}

/// Lister factory serving scripted pages per region
#[derive(Clone, Default)]
pub struct ScriptedListerFactory {
    scripts: Arc<Mutex<HashMap<String, RegionScript>>>,
    instance_calls: Arc<AtomicUsize>,
    created_regions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedListerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the script for a region
    pub fn with_region(self, region: &str, script: RegionScript) -> Self {
        self.scripts.lock().unwrap().insert(region.to_string(), script);
        self
    }

    /// Replace the script for a region between runs
    pub fn set_region(&self, region: &str, script: RegionScript) {
        self.scripts.lock().unwrap().insert(region.to_string(), script);
    }

    /// Number of instance page requests across all regions
    pub fn instance_calls(&self) -> usize {
        self.instance_calls.load(Ordering::SeqCst)
    }

    /// Regions a lister was created for, in order
    pub fn created_regions(&self) -> Vec<String> {
        self.created_regions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotListerFactory for ScriptedListerFactory {
    async fn create(&self, region: &str) -> Result<Box<dyn SnapshotLister>> {
        self.created_regions.lock().unwrap().push(region.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(region)
            .cloned()
            .unwrap_or_default();

        if script.fail_create {
            return Err(Error::backend("scripted", format!("no client for {}", region)));
        }

        Ok(Box::new(ScriptedLister {
            script,
            instance_calls: Arc::clone(&self.instance_calls),
        }))
    }
}

struct ScriptedLister {
    script: RegionScript,
    instance_calls: Arc<AtomicUsize>,
}

fn page_index(token: Option<String>) -> usize {
    token
        .and_then(|t| t.strip_prefix("page-").and_then(|n| n.parse().ok()))
        .unwrap_or(0)
}

fn page_of<T: Clone>(pages: &[Vec<T>], index: usize) -> Page<T> {
    let items = pages.get(index).cloned().unwrap_or_default();
    let next_token = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
    Page::new(items, next_token)
}

#[async_trait]
impl SnapshotLister for ScriptedLister {
    async fn list_instance_snapshots(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<InstanceSnapshot>> {
        self.instance_calls.fetch_add(1, Ordering::SeqCst);
        let index = page_index(page_token);

        if let Some((at, token)) = &self.script.cancel_on_instance_page {
            if *at == index {
                token.cancel();
            }
        }
        if self.script.fail_instance_page == Some(index) {
            return Err(Error::backend("scripted", format!("page {} throttled", index)));
        }

        Ok(page_of(&self.script.instance_pages, index))
    }

    async fn list_cluster_snapshots(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<ClusterSnapshot>> {
        Ok(page_of(&self.script.cluster_pages, page_index(page_token)))
    }

    fn lister_name(&self) -> &'static str {
        "scripted"
    }
}

/// One recorded write call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBatch {
    pub region: String,
    pub identifiers: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// State store backed by [`MemoryStateStore`] that records every write
#[derive(Clone, Default)]
pub struct RecordingStateStore {
    inner: MemoryStateStore,
    batches: Arc<Mutex<Vec<RecordedBatch>>>,
    read_calls: Arc<AtomicUsize>,
    fail_reads: Arc<Mutex<Option<String>>>,
    fail_write_at: Arc<Mutex<Option<usize>>>,
}

impl RecordingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a region's baseline without recording the write
    pub async fn seed(&self, region: &str, records: &[SnapshotInfo], expires_at: DateTime<Utc>) {
        self.inner.write_batch(region, records, expires_at).await.unwrap();
    }

    /// Fail every read of `region`
    pub fn fail_reads_for(&self, region: &str) {
        *self.fail_reads.lock().unwrap() = Some(region.to_string());
    }

    /// Fail the write call with this zero-based index
    pub fn fail_write_at(&self, index: usize) {
        *self.fail_write_at.lock().unwrap() = Some(index);
    }

    /// All recorded write calls, in order
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Current persisted status of a snapshot
    pub async fn status_of(&self, region: &str, identifier: &str) -> Option<String> {
        self.inner.get(region, identifier).await.map(|e| e.status)
    }
}

#[async_trait]
impl StateReader for RecordingStateStore {
    async fn query_partition(
        &self,
        region: &str,
        page_token: Option<String>,
    ) -> Result<Page<StateEntry>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.lock().unwrap().as_deref() == Some(region) {
            return Err(Error::backend("recording", "table unavailable"));
        }
        self.inner.query_partition(region, page_token).await
    }
}

#[async_trait]
impl StateWriter for RecordingStateStore {
    async fn write_batch(
        &self,
        region: &str,
        records: &[SnapshotInfo],
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let index = self.batches.lock().unwrap().len();
        if *self.fail_write_at.lock().unwrap() == Some(index) {
            return Err(Error::backend("recording", "provisioned throughput exceeded"));
        }

        self.inner.write_batch(region, records, expires_at).await?;
        self.batches.lock().unwrap().push(RecordedBatch {
            region: region.to_string(),
            identifiers: records.iter().map(|r| r.identifier.clone()).collect(),
            expires_at,
        });
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// Notifier that records every publish call
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    published: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish call fail
    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// (topic, text) of every accepted publish, in order
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, topic: &str, text: &str) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(Error::backend("recording", "topic does not exist"));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), text.to_string()));
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// Collaborators for one monitor, kept around for assertions
pub struct Harness {
    pub listers: ScriptedListerFactory,
    pub store: RecordingStateStore,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(listers: ScriptedListerFactory) -> Self {
        Self {
            listers,
            store: RecordingStateStore::new(),
            notifier: RecordingNotifier::new(),
        }
    }

    /// Build a monitor over clones of the collaborators
    pub fn monitor(
        &self,
        config: MonitorConfig,
    ) -> (
        snapmon_core::SnapshotMonitor,
        tokio::sync::mpsc::Receiver<snapmon_core::MonitorEvent>,
    ) {
        snapmon_core::SnapshotMonitor::new(
            Arc::new(self.listers.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.notifier.clone()),
            config,
        )
        .expect("monitor construction succeeds")
    }
}

/// Drain every event currently buffered in the receiver
pub fn drain_events(
    rx: &mut tokio::sync::mpsc::Receiver<snapmon_core::MonitorEvent>,
) -> Vec<snapmon_core::MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
