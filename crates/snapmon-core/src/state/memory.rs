// # Memory State Store
//
// In-memory implementation of the state traits.
//
// ## Purpose
//
// Provides a simple, fast state store that doesn't persist across restarts.
// Useful for testing and for long-running daemons where re-alerting once
// after a restart is acceptable.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - First run after a restart reports every monitored snapshot as new
// - No recovery possible (state is in-memory only)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::snapshot::SnapshotInfo;
use crate::state::{DEFAULT_PAGE_SIZE, Partitions, apply_batch, read_page};
use crate::traits::{Page, StateEntry, StateReader, StateStore, StateStoreFactory, StateWriter};

/// In-memory state store implementation
///
/// This implementation stores all partitions in a HashMap protected by a RwLock.
/// It provides no persistence across restarts.
///
/// # Example
///
/// ```rust,no_run
/// use snapmon_core::state::MemoryStateStore;
/// use snapmon_core::snapshot::{SnapshotInfo, SnapshotKind};
/// use snapmon_core::traits::{StateReader, StateWriter};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     let now = chrono::Utc::now();
///
///     let record = SnapshotInfo::new("snap-1", SnapshotKind::Instance, now, "available");
///     store.write_batch("us-west-2", &[record], now + chrono::Duration::days(7)).await?;
///
///     let page = store.query_partition("us-west-2", None).await?;
///     assert_eq!(page.items[0].status, "available");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Partitions>>,
    page_size: usize,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store that returns at most `page_size` entries per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Get the number of entries stored for a region (expired included)
    pub async fn len(&self, region: &str) -> usize {
        self.inner.read().await.get(region).map_or(0, |p| p.len())
    }

    /// Check if the store holds no entries at all
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.values().all(|p| p.is_empty())
    }

    /// Get a single entry, expired or not
    pub async fn get(&self, region: &str, identifier: &str) -> Option<StateEntry> {
        self.inner
            .read()
            .await
            .get(region)
            .and_then(|p| p.get(identifier))
            .cloned()
    }

    /// Clear all partitions
    pub async fn clear(&self) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.clear();
        Ok(())
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateReader for MemoryStateStore {
    async fn query_partition(
        &self,
        region: &str,
        page_token: Option<String>,
    ) -> Result<Page<StateEntry>, Error> {
        let guard = self.inner.read().await;
        Ok(read_page(
            guard.get(region),
            page_token.as_deref(),
            self.page_size,
            Utc::now(),
        ))
    }
}

#[async_trait]
impl StateWriter for MemoryStateStore {
    async fn write_batch(
        &self,
        region: &str,
        records: &[SnapshotInfo],
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        apply_batch(&mut guard, region, records, expires_at, Utc::now());
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for in-memory state stores
pub struct MemoryStateStoreFactory;

#[async_trait]
impl StateStoreFactory for MemoryStateStoreFactory {
    async fn create(&self, config: &StateStoreConfig) -> Result<Arc<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::Memory => Ok(Arc::new(MemoryStateStore::new())),
            _ => Err(Error::config("Invalid config for memory state store")),
        }
    }
}
