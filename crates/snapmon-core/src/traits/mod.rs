//! Core traits for the snapshot monitor
//!
//! This module defines the abstract interfaces that all collaborators must follow.
//!
//! - [`SnapshotLister`]: List snapshots in one region, page by page
//! - [`StateReader`] / [`StateWriter`]: Persisted per-region status baseline
//! - [`Notifier`]: Deliver the aggregated digest

pub mod notifier;
pub mod page;
pub mod snapshot_lister;
pub mod state_store;

pub use notifier::{Notifier, NotifierFactory};
pub use page::Page;
pub use snapshot_lister::{SnapshotLister, SnapshotListerFactory};
pub use state_store::{StateEntry, StateReader, StateStore, StateStoreFactory, StateWriter};
