//! Snapshot monitor engine
//!
//! The SnapshotMonitor is responsible for:
//! - Collecting recent snapshots per region via SnapshotLister
//! - Loading the persisted baseline via StateReader
//! - Publishing one digest per region via Notifier
//! - Persisting changed records after a successful publish
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐
//! │ SnapshotLister  │     │ StateReader  │
//! │ (per region)    │     │ (baseline)   │
//! └─────────────────┘     └──────────────┘
//!          │                     │
//!          └──────────┬──────────┘
//!                     ▼
//!            ┌─────────────────┐
//!            │ SnapshotMonitor │─── MonitorEvent ───▶ receiver
//!            └─────────────────┘
//!                     │
//!          ┌──────────┴──────────┐
//!          ▼                     ▼
//! ┌─────────────────┐     ┌──────────────┐
//! │ Notifier        │ ──▶ │ StateWriter  │
//! │ (digest)        │     │ (batches)    │
//! └─────────────────┘     └──────────────┘
//! ```
//!
//! ## Event Flow (per region)
//!
//! 1. Drain instance and cluster snapshot pages, drop those older than the cutoff
//! 2. Normalize into canonical records
//! 3. Drain the region's persisted partition into a baseline
//! 4. Detect changes; stop here if there are none
//! 5. Publish the digest
//! 6. On success, persist the changed records in batches
//!
//! A failure at any step ends the region. Nothing is retried and nothing
//! already persisted is rolled back.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{FailurePolicy, MonitorConfig};
use crate::error::{Error, Result};
use crate::pipeline::{
    created_after, detect_changes, drain_pages, format_digest, normalize, read_baseline,
    write_in_batches,
};
use crate::traits::{Notifier, SnapshotListerFactory, StateStore};

/// Events emitted by the SnapshotMonitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Run started
    RunStarted {
        regions_count: usize,
    },

    /// Region pipeline started
    RegionStarted {
        region: String,
    },

    /// Snapshots fetched, filtered and normalized
    SnapshotsCollected {
        region: String,
        instances: usize,
        clusters: usize,
    },

    /// Persisted baseline loaded
    BaselineLoaded {
        region: String,
        entries: usize,
    },

    /// Change detection finished
    ChangesDetected {
        region: String,
        changes: usize,
    },

    /// Digest accepted by the notifier
    DigestPublished {
        region: String,
        changes: usize,
    },

    /// Changed records persisted
    StateWritten {
        region: String,
        records: usize,
        batches: usize,
    },

    /// Region pipeline finished
    RegionCompleted {
        region: String,
        changes: usize,
    },

    /// Region pipeline failed
    RegionFailed {
        region: String,
        error: String,
    },

    /// Run finished (also emitted when a fail-fast run stops early)
    RunCompleted {
        succeeded: usize,
        failed: usize,
    },
}

/// Outcome of one region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionReport {
    pub region: String,
    /// Changes detected (and published, if non-zero)
    pub changes: usize,
    /// Records persisted
    pub records_written: usize,
    /// Write calls issued
    pub batches: usize,
}

/// Outcome of one run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Regions that completed, in processing order
    pub completed: Vec<RegionReport>,
    /// Regions that failed, with their error (only filled under `ContinueOnError`)
    pub failures: Vec<(String, Error)>,
}

impl RunReport {
    /// Whether any region failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Total changes across completed regions
    pub fn total_changes(&self) -> usize {
        self.completed.iter().map(|r| r.changes).sum()
    }
}

/// Core snapshot monitor
///
/// The monitor runs the reconciliation pipeline once per configured region,
/// strictly sequentially and in configuration order.
///
/// ## Lifecycle
///
/// 1. Create with [`SnapshotMonitor::new()`]
/// 2. Call [`SnapshotMonitor::run()`] once per scheduled invocation
/// 3. Cancel the token passed to `run` to abort an invocation
///
/// ## Concurrency
///
/// A monitor must not run twice at the same time against the same state
/// store. The daemon's schedule loop guarantees this by awaiting each run
/// before starting the next.
pub struct SnapshotMonitor {
    /// Creates one lister per region
    listers: Arc<dyn SnapshotListerFactory>,

    /// Baseline reads and writes
    state_store: Arc<dyn StateStore>,

    /// Digest delivery
    notifier: Arc<dyn Notifier>,

    /// Immutable run configuration
    config: MonitorConfig,

    /// Statuses that produce alerts
    statuses: HashSet<String>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl SnapshotMonitor {
    /// Create a new snapshot monitor
    ///
    /// # Parameters
    ///
    /// - `listers`: Snapshot lister factory
    /// - `state_store`: State store implementation
    /// - `notifier`: Notifier implementation
    /// - `config`: Monitor configuration
    ///
    /// # Returns
    ///
    /// A tuple of (monitor, event_receiver) where event_receiver yields monitor events
    pub fn new(
        listers: Arc<dyn SnapshotListerFactory>,
        state_store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);
        let statuses = config.monitored_statuses();

        let monitor = Self {
            listers,
            state_store,
            notifier,
            config,
            statuses,
            event_tx: tx,
        };

        Ok((monitor, rx))
    }

    /// The configuration this monitor was built with
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run every configured region once, using the current time
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        self.run_at(Utc::now(), cancel).await
    }

    /// Run every configured region once as of `now`
    ///
    /// `now` fixes both the age cutoff and the expiry written with persisted
    /// records.
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: All regions processed (under `ContinueOnError`,
    ///   failed regions are listed in the report)
    /// - `Err(Error::Region)`: First failing region under `FailFast`
    pub async fn run_at(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<RunReport> {
        info!(
            "Starting run for {} region(s), cutoff {}",
            self.config.regions.len(),
            self.config.cutoff(now)
        );
        self.emit_event(MonitorEvent::RunStarted {
            regions_count: self.config.regions.len(),
        });

        let mut report = RunReport::default();

        for region in &self.config.regions {
            self.emit_event(MonitorEvent::RegionStarted {
                region: region.clone(),
            });

            match self.process_region(region, now, cancel).await {
                Ok(region_report) => {
                    info!(
                        "Region {} completed: {} change(s), {} record(s) written",
                        region, region_report.changes, region_report.records_written
                    );
                    self.emit_event(MonitorEvent::RegionCompleted {
                        region: region.clone(),
                        changes: region_report.changes,
                    });
                    report.completed.push(region_report);
                }
                Err(e) => {
                    error!("Region {} failed: {}", region, e);
                    self.emit_event(MonitorEvent::RegionFailed {
                        region: region.clone(),
                        error: e.to_string(),
                    });

                    let stop = e.is_cancelled()
                        || self.config.engine.failure_policy == FailurePolicy::FailFast;
                    if stop {
                        self.emit_event(MonitorEvent::RunCompleted {
                            succeeded: report.completed.len(),
                            failed: report.failures.len() + 1,
                        });
                        return Err(Error::in_region(region.clone(), e));
                    }

                    report.failures.push((region.clone(), e));
                }
            }
        }

        info!(
            "Run completed: {} region(s) succeeded, {} failed, {} change(s)",
            report.completed.len(),
            report.failures.len(),
            report.total_changes()
        );
        self.emit_event(MonitorEvent::RunCompleted {
            succeeded: report.completed.len(),
            failed: report.failures.len(),
        });

        Ok(report)
    }

    /// Run the pipeline for one region
    async fn process_region(
        &self,
        region: &str,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RegionReport> {
        let mut report = RegionReport {
            region: region.to_string(),
            ..Default::default()
        };

        let cutoff = self.config.cutoff(now);
        let lister = self.listers.create(region).await.map_err(Error::into_fetch)?;

        let instances = drain_pages(cancel, |token| lister.list_instance_snapshots(token))
            .await
            .map_err(Error::into_fetch)?;
        let clusters = drain_pages(cancel, |token| lister.list_cluster_snapshots(token))
            .await
            .map_err(Error::into_fetch)?;

        let instances = created_after(instances, cutoff);
        let clusters = created_after(clusters, cutoff);
        debug!(
            "{}: {} instance and {} cluster snapshot(s) after {} via {}",
            region,
            instances.len(),
            clusters.len(),
            cutoff,
            lister.lister_name()
        );
        self.emit_event(MonitorEvent::SnapshotsCollected {
            region: region.to_string(),
            instances: instances.len(),
            clusters: clusters.len(),
        });

        let current = normalize(instances, clusters)?;

        let baseline = read_baseline(self.state_store.as_ref(), region, cancel).await?;
        self.emit_event(MonitorEvent::BaselineLoaded {
            region: region.to_string(),
            entries: baseline.len(),
        });

        let change_set = detect_changes(region, &current, &baseline, &self.statuses);
        self.emit_event(MonitorEvent::ChangesDetected {
            region: region.to_string(),
            changes: change_set.len(),
        });

        if change_set.is_empty() {
            debug!("No changes in {}", region);
            return Ok(report);
        }
        report.changes = change_set.len();

        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!(
                "cancelled before publishing {} change(s)",
                change_set.len()
            )));
        }

        let digest = format_digest(&change_set.changes);
        self.notifier
            .publish(&self.config.notification_topic, &digest)
            .await
            .map_err(Error::into_notify)?;
        info!(
            "Published digest with {} change(s) for {} via {}",
            change_set.len(),
            region,
            self.notifier.notifier_name()
        );
        self.emit_event(MonitorEvent::DigestPublished {
            region: region.to_string(),
            changes: change_set.len(),
        });

        let summary = write_in_batches(
            self.state_store.as_ref(),
            region,
            &change_set.changed,
            self.config.expiry(now),
            self.config.engine.max_batch_size,
            cancel,
        )
        .await?;
        report.records_written = summary.records;
        report.batches = summary.batches;
        self.emit_event(MonitorEvent::StateWritten {
            region: region.to_string(),
            records: summary.records,
            batches: summary.batches,
        });

        Ok(report)
    }

    /// Emit a monitor event
    ///
    /// Events are dropped (with a warning) when the channel is full.
    fn emit_event(&self, event: MonitorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_report_totals() {
        let report = RunReport {
            completed: vec![
                RegionReport {
                    region: "a".to_string(),
                    changes: 2,
                    ..Default::default()
                },
                RegionReport {
                    region: "b".to_string(),
                    changes: 3,
                    ..Default::default()
                },
            ],
            failures: Vec::new(),
        };

        assert_eq!(report.total_changes(), 5);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_monitor_event_clone() {
        let event = MonitorEvent::RegionFailed {
            region: "us-west-2".to_string(),
            error: "boom".to_string(),
        };
        assert_eq!(event.clone(), event);
    }
}
