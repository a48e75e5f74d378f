//! Bounded worker pool
//!
//! Runs an async worker over every item of a slice with at most `C` workers
//! in flight. Lanes pull the next unclaimed index from a shared cursor, so a
//! slow item never holds up the items behind it.

use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

use super::cancel::{Cancellation, Cancelled};

/// Errors raised by [`run_bounded`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Concurrency ceiling was zero
    #[error("concurrency must be a positive integer, got {0}")]
    InvalidConcurrency(usize),

    /// The run was cancelled before every item finished
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Run `worker` over every item with at most `concurrency` in flight
///
/// The worker receives the item and its index. Results are returned in input
/// order. All lanes are polled on the calling task; nothing is spawned.
///
/// Cancellation is checked before each dispatch. A worker that returns
/// `Err(Cancelled)` stops its lane. Items already running are never aborted
/// by the pool, but once any lane stops early the whole call fails with the
/// cancellation reason.
///
/// # Errors
///
/// - [`PoolError::InvalidConcurrency`] if `concurrency` is zero
/// - [`PoolError::Cancelled`] if `cancel` fires before every item finished
pub async fn run_bounded<'a, T, R, F, Fut>(
    items: &'a [T],
    concurrency: usize,
    cancel: &Cancellation,
    worker: F,
) -> Result<Vec<R>, PoolError>
where
    F: Fn(&'a T, usize) -> Fut,
    Fut: Future<Output = Result<R, Cancelled>>,
{
    if concurrency == 0 {
        return Err(PoolError::InvalidConcurrency(concurrency));
    }
    if let Some(reason) = cancel.reason() {
        return Err(PoolError::Cancelled(reason.to_string()));
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let total = items.len();
    let lanes = concurrency.min(total);
    tracing::debug!(total, lanes, "Starting bounded pool");

    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let worker = &worker;

    let runs = (0..lanes).map(|_| async move {
        let mut done = Vec::new();
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                break;
            }
            match worker(&items[index], index).await {
                Ok(result) => done.push((index, result)),
                Err(Cancelled) => break,
            }
        }
        done
    });

    let finished = join_all(runs).await;

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    for (index, result) in finished.into_iter().flatten() {
        slots[index] = Some(result);
    }

    let complete = slots.iter().all(Option::is_some);
    if !complete || cancel.is_cancelled() {
        let reason = cancel.reason().unwrap_or("worker stopped before completion");
        return Err(PoolError::Cancelled(reason.to_string()));
    }

    Ok(slots.into_iter().flatten().collect())
}
