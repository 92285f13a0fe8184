// # State Store Implementations
//
// This module provides implementations of the StateReader and StateWriter
// traits for different persistence strategies.
//
// Both stores keep one partition per region, ordered by identifier, and page
// through it using the last identifier of the previous page as the token.

pub mod file;
pub mod memory;

pub use file::{FileStateStore, FileStateStoreFactory};
pub use memory::{MemoryStateStore, MemoryStateStoreFactory};

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::snapshot::SnapshotInfo;
use crate::traits::{Page, StateEntry};

/// Default number of entries returned per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Region → (identifier → entry)
pub(crate) type Partitions = HashMap<String, BTreeMap<String, StateEntry>>;

/// Read one page of a partition, skipping expired entries
pub(crate) fn read_page(
    partition: Option<&BTreeMap<String, StateEntry>>,
    page_token: Option<&str>,
    page_size: usize,
    now: DateTime<Utc>,
) -> Page<StateEntry> {
    let Some(partition) = partition else {
        return Page::default();
    };

    let mut live = partition
        .iter()
        .filter(|(id, _)| page_token.is_none_or(|token| id.as_str() > token))
        .filter(|(_, entry)| !entry.is_expired(now))
        .map(|(_, entry)| entry.clone());

    let items: Vec<StateEntry> = live.by_ref().take(page_size).collect();
    let next_token = match (live.next(), items.last()) {
        (Some(_), Some(last)) => Some(last.identifier.clone()),
        _ => None,
    };

    Page::new(items, next_token)
}

/// Overwrite entries for `records` and prune expired ones
pub(crate) fn apply_batch(
    partitions: &mut Partitions,
    region: &str,
    records: &[SnapshotInfo],
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    let partition = partitions.entry(region.to_string()).or_default();
    for record in records {
        partition.insert(
            record.identifier.clone(),
            StateEntry {
                identifier: record.identifier.clone(),
                status: record.status.clone(),
                expires_at: Some(expires_at),
            },
        );
    }
    partition.retain(|_, entry| !entry.is_expired(now));
}
