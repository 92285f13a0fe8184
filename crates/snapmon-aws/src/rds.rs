//! RDS snapshot lister
//!
//! One page per call via `DescribeDBSnapshots` / `DescribeDBClusterSnapshots`,
//! continued with the service's `Marker`. Records are passed through with
//! every field optional; the core normalizer decides what is usable.

use async_trait::async_trait;
use aws_sdk_rds::Client;
use aws_sdk_rds::primitives::DateTime as SdkDateTime;
use aws_sdk_rds::types::{DbClusterSnapshot, DbSnapshot};
use chrono::{DateTime, Utc};
use snapmon_core::snapshot::{ClusterSnapshot, InstanceSnapshot};
use snapmon_core::traits::{Page, SnapshotLister, SnapshotListerFactory};
use snapmon_core::{Error, Result};
use tracing::debug;

use crate::load_sdk_config;

/// Lister bound to one region
pub struct RdsLister {
    client: Client,
    region: String,
}

impl RdsLister {
    /// Build a lister over an existing client
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    /// Region this lister queries
    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl SnapshotLister for RdsLister {
    async fn list_instance_snapshots(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<InstanceSnapshot>> {
        let output = self
            .client
            .describe_db_snapshots()
            .set_marker(page_token)
            .send()
            .await
            .map_err(|e| {
                Error::backend(
                    "rds",
                    format!("DescribeDBSnapshots failed in {}: {}", self.region, e),
                )
            })?;

        let items: Vec<InstanceSnapshot> = output.db_snapshots().iter().map(instance_snapshot).collect();
        debug!("{}: {} instance snapshot(s) on page", self.region, items.len());

        Ok(Page::new(items, continuation(output.marker())))
    }

    async fn list_cluster_snapshots(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<ClusterSnapshot>> {
        let output = self
            .client
            .describe_db_cluster_snapshots()
            .set_marker(page_token)
            .send()
            .await
            .map_err(|e| {
                Error::backend(
                    "rds",
                    format!("DescribeDBClusterSnapshots failed in {}: {}", self.region, e),
                )
            })?;

        let items: Vec<ClusterSnapshot> = output
            .db_cluster_snapshots()
            .iter()
            .map(cluster_snapshot)
            .collect();
        debug!("{}: {} cluster snapshot(s) on page", self.region, items.len());

        Ok(Page::new(items, continuation(output.marker())))
    }

    fn lister_name(&self) -> &'static str {
        "rds"
    }
}

/// Creates one RDS client per region
#[derive(Debug, Clone, Default)]
pub struct RdsListerFactory {
    endpoint_url: Option<String>,
}

impl RdsListerFactory {
    /// Create a factory; `endpoint_url` overrides the RDS endpoint (e.g. localstack)
    pub fn new(endpoint_url: Option<String>) -> Self {
        Self { endpoint_url }
    }
}

#[async_trait]
impl SnapshotListerFactory for RdsListerFactory {
    async fn create(&self, region: &str) -> Result<Box<dyn SnapshotLister>> {
        if region.is_empty() {
            return Err(Error::config("RDS lister requires a region"));
        }

        let config = load_sdk_config(Some(region), self.endpoint_url.as_deref()).await;
        debug!("Created RDS client for {}", region);

        Ok(Box::new(RdsLister::new(Client::new(&config), region)))
    }
}

/// An empty marker means the listing is exhausted
fn continuation(marker: Option<&str>) -> Option<String> {
    marker.filter(|m| !m.is_empty()).map(str::to_string)
}

fn timestamp(time: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn instance_snapshot(snapshot: &DbSnapshot) -> InstanceSnapshot {
    InstanceSnapshot {
        identifier: snapshot.db_snapshot_identifier().map(str::to_string),
        instance_identifier: snapshot.db_instance_identifier().map(str::to_string),
        created_at: timestamp(snapshot.snapshot_create_time()),
        status: snapshot.status().map(str::to_string),
    }
}

fn cluster_snapshot(snapshot: &DbClusterSnapshot) -> ClusterSnapshot {
    ClusterSnapshot {
        identifier: snapshot.db_cluster_snapshot_identifier().map(str::to_string),
        cluster_identifier: snapshot.db_cluster_identifier().map(str::to_string),
        created_at: timestamp(snapshot.snapshot_create_time()),
        status: snapshot.status().map(str::to_string),
    }
}
