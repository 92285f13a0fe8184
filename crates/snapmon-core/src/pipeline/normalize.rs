//! Record normalizer
//!
//! Maps the typed snapshot variants onto [`SnapshotInfo`]. A record missing
//! its identifier, status or creation time breaks the listing contract and
//! fails the region run; nothing is dropped or defaulted here.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::snapshot::{ClusterSnapshot, InstanceSnapshot, SnapshotInfo, SnapshotKind};

impl TryFrom<InstanceSnapshot> for SnapshotInfo {
    type Error = Error;

    fn try_from(snapshot: InstanceSnapshot) -> Result<Self> {
        build(
            SnapshotKind::Instance,
            snapshot.identifier,
            snapshot.created_at,
            snapshot.status,
            snapshot.instance_identifier,
        )
    }
}

impl TryFrom<ClusterSnapshot> for SnapshotInfo {
    type Error = Error;

    fn try_from(snapshot: ClusterSnapshot) -> Result<Self> {
        build(
            SnapshotKind::Cluster,
            snapshot.identifier,
            snapshot.created_at,
            snapshot.status,
            snapshot.cluster_identifier,
        )
    }
}

fn build(
    kind: SnapshotKind,
    identifier: Option<String>,
    created_at: Option<DateTime<Utc>>,
    status: Option<String>,
    source_identifier: Option<String>,
) -> Result<SnapshotInfo> {
    let identifier = identifier.filter(|id| !id.is_empty()).ok_or_else(|| {
        Error::normalization(format!("{} snapshot without an identifier", kind))
    })?;

    let status = status.ok_or_else(|| {
        Error::normalization(format!("{} snapshot {} has no status", kind, identifier))
    })?;

    let created_at = created_at.ok_or_else(|| {
        Error::normalization(format!(
            "{} snapshot {} has no creation time",
            kind, identifier
        ))
    })?;

    Ok(SnapshotInfo {
        identifier,
        kind,
        created_at,
        status,
        source_identifier: source_identifier.filter(|id| !id.is_empty()),
    })
}

/// Normalize instance then cluster snapshots, each in input order
pub fn normalize(
    instances: Vec<InstanceSnapshot>,
    clusters: Vec<ClusterSnapshot>,
) -> Result<Vec<SnapshotInfo>> {
    let mut records = Vec::with_capacity(instances.len() + clusters.len());

    for snapshot in instances {
        records.push(SnapshotInfo::try_from(snapshot)?);
    }
    for snapshot in clusters {
        records.push(SnapshotInfo::try_from(snapshot)?);
    }

    Ok(records)
}
