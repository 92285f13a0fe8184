//! Change detector
//!
//! Compares normalized snapshots against the persisted baseline. Only
//! monitored statuses are considered. A snapshot whose status matches the
//! baseline produces nothing, so reprocessing an unchanged world never
//! re-alerts.
//!
//! Instance and cluster snapshots share one identifier keyspace per region.
//! When both kinds report the same identifier, the record seen last wins.

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::pipeline::baseline::Baseline;
use crate::snapshot::{SnapshotInfo, StatusChange};

/// Output of change detection for one region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Detected changes, in input order
    pub changes: Vec<StatusChange>,
    /// The records behind `changes`, in the same order; the only records persisted
    pub changed: Vec<SnapshotInfo>,
}

impl ChangeSet {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of detected changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Compute the change set for `region`
///
/// Unchanged monitored records are deliberately left out of
/// [`ChangeSet::changed`]: persisting them would push their expiry forward on
/// every no-op run.
pub fn detect_changes(
    region: &str,
    current: &[SnapshotInfo],
    baseline: &Baseline,
    statuses_to_monitor: &HashSet<String>,
) -> ChangeSet {
    let mut set = ChangeSet::default();

    let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(current.len());
    for (index, record) in current.iter().enumerate() {
        last_seen.insert(record.identifier.as_str(), index);
    }

    for (index, record) in current.iter().enumerate() {
        if last_seen.get(record.identifier.as_str()) != Some(&index) {
            warn!(
                "{}: {} snapshot {} shadowed by a later record with the same identifier",
                region, record.kind, record.identifier
            );
            continue;
        }
        if !statuses_to_monitor.contains(&record.status) {
            continue;
        }

        let previous = baseline.get(&record.identifier);
        if previous.is_some_and(|status| *status == record.status) {
            continue;
        }

        set.changes.push(StatusChange {
            identifier: record.identifier.clone(),
            previous_status: previous.cloned(),
            current_status: record.status.clone(),
            region: region.to_string(),
            // Echoes the snapshot identifier, not `source_identifier`.
            display_label: record.identifier.clone(),
        });
        set.changed.push(record.clone());
    }

    set
}
