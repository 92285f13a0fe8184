// # State Store Traits
//
// Defines the interface for the persisted per-region status baseline.
//
// ## Purpose
//
// The state store prevents duplicate alerts by tracking the last known status
// of each snapshot, partitioned by region. Entries carry an expiry managed by
// the store itself; entries past their expiry are never returned by reads.
//
// ## Implementations
//
// - Memory and JSON file: `snapmon_core::state`
// - DynamoDB: `snapmon-aws` crate

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::StateStoreConfig;
use crate::snapshot::SnapshotInfo;
use crate::traits::Page;

/// One persisted baseline entry
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateEntry {
    /// Snapshot identifier
    pub identifier: String,
    /// Last known status
    pub status: String,
    /// When the entry expires, if the store reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StateEntry {
    /// Create an entry without expiry information
    pub fn new(identifier: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            status: status.into(),
            expires_at: None,
        }
    }

    /// Check if the entry has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Read side of the state store
///
/// # Trust Level: Trusted (Core Component)
///
/// Reads must return the complete partition or fail. A store that silently
/// returned a partial baseline would make existing snapshots look new.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Read one page of a region's partition
    ///
    /// # Parameters
    ///
    /// - `region`: Partition key
    /// - `page_token`: `None` for the first page, otherwise the previous page's `next_token`
    ///
    /// # Returns
    ///
    /// - `Ok(Page)`: Entries of this page (an empty first page is a valid, empty baseline)
    /// - `Err(Error)`: Storage error
    async fn query_partition(
        &self,
        region: &str,
        page_token: Option<String>,
    ) -> Result<Page<StateEntry>, crate::Error>;
}

/// Write side of the state store
#[async_trait]
pub trait StateWriter: Send + Sync {
    /// Persist one batch of records for a region
    ///
    /// Each record overwrites the entry with the same identifier. The caller
    /// never passes more records than the configured batch size.
    ///
    /// # Parameters
    ///
    /// - `region`: Partition key
    /// - `records`: Records to persist (identifier and status)
    /// - `expires_at`: Expiry to store on every record of the batch
    async fn write_batch(
        &self,
        region: &str,
        records: &[SnapshotInfo],
        expires_at: DateTime<Utc>,
    ) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// A store implementing both sides
pub trait StateStore: StateReader + StateWriter {}

impl<T: StateReader + StateWriter> StateStore for T {}

/// Helper trait for constructing state stores from configuration
#[async_trait]
pub trait StateStoreFactory: Send + Sync {
    /// Create a StateStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: State store configuration
    async fn create(&self, config: &StateStoreConfig) -> Result<Arc<dyn StateStore>, crate::Error>;
}
