//! Region reconciliation pipeline
//!
//! ```text
//! SnapshotLister ─► drain_pages ─► created_after ─► normalize ─┐
//!                                                              ├─► detect_changes ─► format_digest ─► Notifier
//! StateReader ───► read_baseline ──────────────────────────────┘                                         │
//!                                                                                                        ▼
//!                                                                          write_in_batches ─► StateWriter
//! ```
//!
//! Every stage is a free function so it can be tested without an engine.
//! The [`crate::engine::SnapshotMonitor`] strings them together per region.

pub mod baseline;
pub mod detect;
pub mod digest;
pub mod fetch;
pub mod normalize;
pub mod persist;

pub use baseline::{Baseline, read_baseline};
pub use detect::{ChangeSet, detect_changes};
pub use digest::format_digest;
pub use fetch::{created_after, drain_pages};
pub use normalize::normalize;
pub use persist::{WriteSummary, write_in_batches};
