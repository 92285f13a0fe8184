//! Snapshot record types
//!
//! Listing collaborators return typed variants ([`InstanceSnapshot`],
//! [`ClusterSnapshot`]) whose fields are all optional: nothing returned by a
//! collaborator is trusted until it has been normalized into a
//! [`SnapshotInfo`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of database snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Snapshot of a single database instance
    Instance,
    /// Snapshot of a database cluster
    Cluster,
}

impl SnapshotKind {
    /// Tag used in logs and persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Instance => "instance",
            SnapshotKind::Cluster => "cluster",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability shared by every snapshot variant: an optional creation time
///
/// The age filter and the pagination helpers are written once against this
/// trait instead of once per snapshot kind.
pub trait HasCreationTime {
    /// When the snapshot was created, if the collaborator reported it
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

/// Instance snapshot as returned by a listing collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    /// Snapshot identifier
    pub identifier: Option<String>,
    /// Identifier of the instance the snapshot was taken from
    pub instance_identifier: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Status string, copied verbatim
    pub status: Option<String>,
}

/// Cluster snapshot as returned by a listing collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Snapshot identifier
    pub identifier: Option<String>,
    /// Identifier of the cluster the snapshot was taken from
    pub cluster_identifier: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Status string, copied verbatim
    pub status: Option<String>,
}

impl HasCreationTime for InstanceSnapshot {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl HasCreationTime for ClusterSnapshot {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Canonical snapshot record
///
/// Produced by the normalizer; every field required by the pipeline is
/// present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Snapshot identifier, unique within region and kind
    pub identifier: String,
    /// Instance or cluster
    pub kind: SnapshotKind,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Status, open vocabulary ("available", "creating", "failed", ...)
    pub status: String,
    /// Owning instance or cluster, when the collaborator reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_identifier: Option<String>,
}

impl SnapshotInfo {
    /// Create a canonical record
    pub fn new(
        identifier: impl Into<String>,
        kind: SnapshotKind,
        created_at: DateTime<Utc>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            created_at,
            status: status.into(),
            source_identifier: None,
        }
    }

    /// Set the owning instance or cluster identifier
    pub fn with_source_identifier(mut self, source: impl Into<String>) -> Self {
        self.source_identifier = Some(source.into());
        self
    }
}

impl HasCreationTime for SnapshotInfo {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

/// A detected status change for one snapshot in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Snapshot identifier
    pub identifier: String,
    /// Last persisted status; `None` when the snapshot is seen for the first time
    pub previous_status: Option<String>,
    /// Status observed in this run
    pub current_status: String,
    /// Region the snapshot lives in
    pub region: String,
    /// Secondary field shown in the digest
    pub display_label: String,
}

impl StatusChange {
    /// Whether this is the first observation of the snapshot
    pub fn is_new(&self) -> bool {
        self.previous_status.is_none()
    }
}
