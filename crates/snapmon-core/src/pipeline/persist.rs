//! Batched state writer

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::SnapshotInfo;
use crate::traits::StateWriter;

/// What a batched write persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records persisted
    pub records: usize,
    /// Write calls issued
    pub batches: usize,
}

/// Persist `records` in consecutive chunks of at most `max_batch_size`
///
/// Chunks are written sequentially. The first failing chunk stops the write
/// with [`Error::Persist`]; chunks written before it stay written, since the
/// next run recomputes its delta from whatever is actually persisted.
/// Cancellation is checked before every chunk.
pub async fn write_in_batches<W: StateWriter + ?Sized>(
    writer: &W,
    region: &str,
    records: &[SnapshotInfo],
    expires_at: DateTime<Utc>,
    max_batch_size: usize,
    cancel: &CancellationToken,
) -> Result<WriteSummary> {
    if max_batch_size == 0 {
        return Err(Error::config("Max batch size must be > 0"));
    }

    let total_batches = records.len().div_ceil(max_batch_size);
    let mut summary = WriteSummary::default();

    for chunk in records.chunks(max_batch_size) {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!(
                "state write for {} cancelled after {} of {} batch(es) ({} record(s) persisted)",
                region, summary.batches, total_batches, summary.records
            )));
        }

        writer
            .write_batch(region, chunk, expires_at)
            .await
            .map_err(|e| {
                Error::persist(format!(
                    "batch {}/{} for {} failed after {} record(s) persisted: {}",
                    summary.batches + 1,
                    total_batches,
                    region,
                    summary.records,
                    e
                ))
            })?;

        summary.batches += 1;
        summary.records += chunk.len();
        debug!(
            "Wrote batch {}/{} ({} record(s)) to {} for {}",
            summary.batches,
            total_batches,
            chunk.len(),
            writer.store_name(),
            region
        );
    }

    Ok(summary)
}
