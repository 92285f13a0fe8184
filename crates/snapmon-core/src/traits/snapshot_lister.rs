// # Snapshot Lister Trait
//
// Defines the interface for listing database snapshots in one region.
//
// ## Implementations
//
// - RDS: `snapmon-aws` crate
//
// ## Usage
//
// ```rust,ignore
// use snapmon_core::traits::SnapshotListerFactory;
//
// let lister = factory.create("us-west-2").await?;
// let first = lister.list_instance_snapshots(None).await?;
// if let Some(token) = first.next_token {
//     let second = lister.list_instance_snapshots(Some(token)).await?;
// }
// ```

use async_trait::async_trait;

use crate::snapshot::{ClusterSnapshot, InstanceSnapshot};
use crate::traits::Page;

/// Trait for snapshot listing implementations
///
/// A lister is bound to exactly one region. Each call returns a single page;
/// draining, filtering and normalization are owned by the core pipeline.
///
/// # Trust Level: Untrusted
///
/// Listers must not:
/// - retry, back off or rate limit (a failed page fails the whole fetch)
/// - filter by age (the pipeline applies the cutoff)
/// - default missing fields (the normalizer rejects incomplete records)
#[async_trait]
pub trait SnapshotLister: Send + Sync {
    /// List one page of instance snapshots
    ///
    /// # Parameters
    ///
    /// - `page_token`: `None` for the first page, otherwise the previous page's `next_token`
    async fn list_instance_snapshots(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<InstanceSnapshot>, crate::Error>;

    /// List one page of cluster snapshots
    ///
    /// # Parameters
    ///
    /// - `page_token`: `None` for the first page, otherwise the previous page's `next_token`
    async fn list_cluster_snapshots(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<ClusterSnapshot>, crate::Error>;

    /// Get the lister name (for logging/debugging)
    fn lister_name(&self) -> &'static str;
}

/// Creates one [`SnapshotLister`] per region
///
/// Regions never share a client instance.
#[async_trait]
pub trait SnapshotListerFactory: Send + Sync {
    /// Create a lister bound to `region`
    async fn create(&self, region: &str) -> Result<Box<dyn SnapshotLister>, crate::Error>;
}
