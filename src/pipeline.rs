//! Throttled batch pipeline.
//!
//! Applies an async operation to a list of items strictly in order, one at
//! a time, pausing between items (or between chunks) so a rate-limited
//! remote service is never flooded. A failing item is logged and recorded
//! in the outcome; it never stops the rest of the batch. There is no retry.
//!
//! # Example
//!
//! ```no_run
//! use numisma::pipeline::BatchPipeline;
//!
//! # async fn example() {
//! let outcome = BatchPipeline::for_valuation()
//!     .run(vec![1, 2, 3], |n| async move { Ok::<_, numisma::NumismaError>(n * 10) }, |p| {
//!         println!("{}/{}", p.completed, p.total);
//!     })
//!     .await;
//! assert_eq!(outcome.succeeded, vec![10, 20, 30]);
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config;
use crate::error::{NumismaError, Result};

// ---------------------------------------------------------------------------
// Progress / outcome types
// ---------------------------------------------------------------------------

/// Progress report handed to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Why an item did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The operation returned an error.
    Failed,
    /// The operation exceeded the per-item deadline.
    TimedOut,
    /// The batch was cancelled before or while the item ran.
    Cancelled,
}

/// One item that did not succeed, with its position in the input.
#[derive(Debug, Clone)]
pub struct BatchFailure<T> {
    pub index: usize,
    pub item: T,
    pub kind: FailureKind,
    pub reason: String,
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct BatchOutcome<T, R> {
    /// Results of the items that succeeded, in input order.
    pub succeeded: Vec<R>,
    /// Items that failed, in input order.
    pub failed: Vec<BatchFailure<T>>,
    /// Whether the cancellation token fired during the run.
    pub cancelled: bool,
}

impl<T, R> BatchOutcome<T, R> {
    fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }

    /// True when no item failed and the run was not cancelled.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

// ---------------------------------------------------------------------------
// BatchPipeline
// ---------------------------------------------------------------------------

/// Sequential, paced batch driver.
///
/// Built with chained setters; the defaults are no delay, chunks of one,
/// no deadline and no cancellation.
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    delay: Duration,
    chunk_size: usize,
    item_timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            chunk_size: 1,
            item_timeout: None,
            cancel: None,
        }
    }
}

impl BatchPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline paced for valuation requests (2s between items).
    pub fn for_valuation() -> Self {
        Self::new().delay(config::ESTIMATE_DELAY)
    }

    /// Pipeline for spreadsheet import (chunks of 10, no delay).
    pub fn for_import() -> Self {
        Self::new().chunk_size(config::IMPORT_CHUNK_SIZE)
    }

    /// Idle time after each item (or chunk) except the last.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Items handed to each [`run_chunked`](Self::run_chunked) call.
    /// Values below one are treated as one.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Deadline for a single operation call.
    pub fn item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    /// Token that stops the run between items, during pauses, or mid-call.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Apply `op` to every item, one at a time, in input order.
    ///
    /// `progress` is called with `(0, total)` up front and once after every
    /// item resolves; the final call always has `completed == total`.
    pub async fn run<T, R, F, Fut, P>(&self, items: Vec<T>, mut op: F, progress: P) -> BatchOutcome<T, R>
    where
        T: Clone,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R>>,
        P: FnMut(Progress),
    {
        let per_item = |chunk: Vec<T>| {
            let calls: Vec<Fut> = chunk.into_iter().map(&mut op).collect();
            async move {
                let mut out = Vec::with_capacity(calls.len());
                for call in calls {
                    out.push(call.await?);
                }
                Ok::<_, NumismaError>(out)
            }
        };
        self.drive(items, 1, per_item, progress).await
    }

    /// Apply `op` to consecutive chunks of [`chunk_size`](Self::chunk_size)
    /// items.
    ///
    /// A failed chunk marks each of its items failed. Progress is reported
    /// at chunk boundaries.
    pub async fn run_chunked<T, R, F, Fut, P>(&self, items: Vec<T>, op: F, progress: P) -> BatchOutcome<T, R>
    where
        T: Clone,
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
        P: FnMut(Progress),
    {
        self.drive(items, self.chunk_size, op, progress).await
    }

    async fn drive<T, R, F, Fut, P>(
        &self,
        items: Vec<T>,
        chunk_size: usize,
        mut op: F,
        mut progress: P,
    ) -> BatchOutcome<T, R>
    where
        T: Clone,
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
        P: FnMut(Progress),
    {
        let total = items.len();
        let mut outcome = BatchOutcome::new();
        progress(Progress { completed: 0, total });

        let mut start = 0;
        let mut remaining = items.into_iter();
        while start < total {
            let chunk: Vec<T> = remaining.by_ref().take(chunk_size).collect();
            let end = start + chunk.len();

            if !outcome.cancelled && self.is_cancelled() {
                outcome.cancelled = true;
                tracing::info!(completed = start, total, "Batch cancelled");
            }

            if outcome.cancelled {
                record_failures(&mut outcome, start, chunk, FailureKind::Cancelled, "batch cancelled");
            } else {
                match self.guard(op(chunk.clone())).await {
                    Ok(results) => outcome.succeeded.extend(results),
                    Err(e) => {
                        let kind = match e {
                            NumismaError::Cancelled => FailureKind::Cancelled,
                            NumismaError::Timeout(_) => FailureKind::TimedOut,
                            _ => FailureKind::Failed,
                        };
                        if kind == FailureKind::Cancelled {
                            outcome.cancelled = true;
                        }
                        tracing::warn!(first = start, last = end - 1, error = %e, "Batch item failed; skipping");
                        record_failures(&mut outcome, start, chunk, kind, &e.to_string());
                    }
                }
            }

            progress(Progress { completed: end, total });
            start = end;

            if start < total && !outcome.cancelled && !self.delay.is_zero() && !self.pause().await {
                outcome.cancelled = true;
                tracing::info!(completed = start, total, "Batch cancelled during pause");
            }
        }

        tracing::debug!(
            total,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Batch finished"
        );
        outcome
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Sleep for the configured delay. Returns `false` if cancelled first.
    async fn pause(&self) -> bool {
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(self.delay) => true,
            },
            None => {
                tokio::time::sleep(self.delay).await;
                true
            }
        }
    }

    /// Bound one operation call by the deadline and the cancellation token.
    async fn guard<V, Fut>(&self, call: Fut) -> Result<V>
    where
        Fut: Future<Output = Result<V>>,
    {
        let bounded = async {
            match self.item_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| NumismaError::Timeout(limit))?,
                None => call.await,
            }
        };
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(NumismaError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}

fn record_failures<T, R>(
    outcome: &mut BatchOutcome<T, R>,
    start: usize,
    chunk: Vec<T>,
    kind: FailureKind,
    reason: &str,
) {
    for (offset, item) in chunk.into_iter().enumerate() {
        outcome.failed.push(BatchFailure {
            index: start + offset,
            item,
            kind,
            reason: reason.to_string(),
        });
    }
}
