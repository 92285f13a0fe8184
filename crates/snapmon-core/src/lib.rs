// # snapmon-core
//
// Core library for the scheduled database snapshot status monitor.
//
// ## Architecture Overview
//
// This library provides the reconciliation pipeline and the capability traits
// it consumes:
// - **SnapshotLister**: Trait for listing instance and cluster snapshots of one region
// - **StateReader / StateWriter**: Traits for the persisted per-region status baseline
// - **Notifier**: Trait for delivering the aggregated digest
// - **SnapshotMonitor**: Engine that runs fetch → filter → normalize → detect → publish → persist
// - **BackendRegistry**: Plugin-based registry for collaborator implementations
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Pipeline logic is separate from backends
// 2. **Region Isolation**: State and alerts are strictly partitioned per region
// 3. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Only changed records are persisted, so re-runs never re-alert

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod log_notifier;
pub mod pipeline;
pub mod snapshot;
pub mod state;

// Re-export core types for convenience
pub use traits::{Notifier, SnapshotLister, SnapshotListerFactory, StateReader, StateStore, StateWriter};
pub use engine::{MonitorEvent, RegionReport, RunReport, SnapshotMonitor};
pub use registry::BackendRegistry;
pub use config::{EngineConfig, FailurePolicy, MonitorConfig, NotifierConfig, StateStoreConfig};
pub use error::{Error, Result};
pub use log_notifier::LogNotifier;
pub use snapshot::{ClusterSnapshot, InstanceSnapshot, SnapshotInfo, SnapshotKind, StatusChange};
pub use state::{FileStateStore, MemoryStateStore};
