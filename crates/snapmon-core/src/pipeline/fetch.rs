//! Paginated fetch and age filter

use chrono::{DateTime, Utc};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::HasCreationTime;
use crate::traits::Page;

/// Drain a paged listing into one ordered sequence
///
/// `next_page` is called with `None` first and then with each page's
/// continuation token until a page without one is returned. Items are
/// concatenated in the order the collaborator returned them.
///
/// The first failing page aborts the drain and its error is returned as is;
/// pages fetched before the failure are discarded. Cancellation is checked
/// before every request and while a request is in flight.
pub async fn drain_pages<T, F, Fut>(cancel: &CancellationToken, mut next_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!(
                "cancelled after {} page(s)",
                pages
            )));
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::cancelled(format!(
                    "cancelled while fetching page {}",
                    pages + 1
                )));
            }
            page = next_page(token.take()) => page?,
        };

        pages += 1;
        debug!("Fetched page {} with {} item(s)", pages, page.items.len());
        items.extend(page.items);

        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(items)
}

/// Keep records created strictly after `cutoff`, preserving order
///
/// Records without a creation time are dropped, never defaulted.
pub fn created_after<T: HasCreationTime>(records: Vec<T>, cutoff: DateTime<Utc>) -> Vec<T> {
    records
        .into_iter()
        .filter(|record| record.created_at().is_some_and(|created| created > cutoff))
        .collect()
}
