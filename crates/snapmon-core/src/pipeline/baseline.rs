//! State store reader

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::fetch::drain_pages;
use crate::traits::StateReader;

/// Persisted identifier → status mapping for one region
pub type Baseline = HashMap<String, String>;

/// Drain a region's persisted partition into a [`Baseline`]
///
/// An empty baseline is a valid result (first run). Any read failure aborts
/// with [`Error::StateRead`]: detecting against a partial baseline would
/// report existing snapshots as new.
pub async fn read_baseline<R: StateReader + ?Sized>(
    reader: &R,
    region: &str,
    cancel: &CancellationToken,
) -> Result<Baseline> {
    let entries = drain_pages(cancel, |token| reader.query_partition(region, token))
        .await
        .map_err(Error::into_state_read)?;

    let baseline: Baseline = entries
        .into_iter()
        .map(|entry| (entry.identifier, entry.status))
        .collect();

    debug!("Loaded {} baseline entries for {}", baseline.len(), region);
    Ok(baseline)
}
