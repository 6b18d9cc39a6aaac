//! Async wrapper around [`Numisma`] for use in Tokio runtimes.
//!
//! Store work runs on the blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the event loop free while the
//! valuation and import pipelines await remote calls.
//!
//! # Example
//!
//! ```no_run
//! use numisma::{AsyncNumisma, BatchPipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let db = AsyncNumisma::builder().build().await.unwrap();
//!     let client = db.run(|d| d.gemini_client()).await.unwrap();
//!
//!     let outcome = db
//!         .estimate_pending(&client, &BatchPipeline::for_valuation(), |p| {
//!             println!("{}/{}", p.completed, p.total);
//!         })
//!         .await
//!         .unwrap();
//!     println!("valued {} coins", outcome.succeeded.len());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::appraisal::{Appraiser, FragmentMapper};
use crate::error::{NumismaError, Result};
use crate::models::{self, Coin};
use crate::normalize::{Identity, Normalizer, RawRow};
use crate::pipeline::{BatchFailure, BatchOutcome, BatchPipeline, Progress};
use crate::Numisma;

// ---------------------------------------------------------------------------
// AsyncNumismaBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncNumisma`] instance.
pub struct AsyncNumismaBuilder {
    data_dir: Option<PathBuf>,
    in_memory: bool,
    timeout: Duration,
}

impl Default for AsyncNumismaBuilder {
    fn default() -> Self {
        Self {
            data_dir: None,
            in_memory: false,
            timeout: Duration::from_secs(120),
        }
    }
}

impl AsyncNumismaBuilder {
    /// Set a custom data directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep everything in memory.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// HTTP timeout for model requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open the store on the blocking thread pool.
    pub async fn build(self) -> Result<AsyncNumisma> {
        tokio::task::spawn_blocking(move || {
            let mut builder = Numisma::builder();
            if let Some(dir) = self.data_dir {
                builder = builder.data_dir(dir);
            }
            let db = builder.in_memory(self.in_memory).timeout(self.timeout).build()?;
            Ok(AsyncNumisma::new(db))
        })
        .await
        .map_err(|e| NumismaError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// ImportReport
// ---------------------------------------------------------------------------

/// Result of a spreadsheet import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Completed coins, in input order.
    pub coins: Vec<Coin>,
    /// Rows with neither a year nor a denomination, set aside for manual
    /// fix-up.
    pub broken: Vec<RawRow>,
    /// Rows whose normalization chunk failed.
    pub failed: Vec<BatchFailure<RawRow>>,
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// AsyncNumisma
// ---------------------------------------------------------------------------

/// Async wrapper around [`Numisma`].
///
/// The underlying [`Numisma`] is protected by a [`Mutex`] since the DuckDB
/// connection is not shareable across threads.
#[derive(Clone)]
pub struct AsyncNumisma {
    inner: Arc<Mutex<Numisma>>,
}

impl AsyncNumisma {
    /// Create a new builder for configuring the async catalog.
    pub fn builder() -> AsyncNumismaBuilder {
        AsyncNumismaBuilder::default()
    }

    /// Wrap an already built catalog.
    pub fn new(db: Numisma) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Run a sync catalog operation on the blocking thread pool.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use numisma::AsyncNumisma;
    /// # async fn example() -> numisma::Result<()> {
    /// # let db = AsyncNumisma::builder().build().await?;
    /// let coins = db.run(|d| d.coins().list()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Numisma) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| NumismaError::InvalidArgument("catalog lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| NumismaError::InvalidArgument(format!("Task join error: {e}")))?
    }

    // -- Valuation ---------------------------------------------------------

    /// Value one coin and store the result.
    pub async fn estimate_one<A: Appraiser>(&self, appraiser: &A, id: &str) -> Result<Coin> {
        let lookup = id.to_string();
        let coin = self
            .run(move |d| {
                d.coins()
                    .get(&lookup)?
                    .ok_or_else(|| NumismaError::NotFound(format!("coin {}", lookup)))
            })
            .await?;
        self.value_and_store(appraiser, coin).await
    }

    /// Value every coin that has no maximum estimate yet.
    ///
    /// Coins are sent one at a time through `pipeline`. Each success is
    /// written to the store before the next coin starts, so an interrupted
    /// run keeps everything valued so far. Failures are reported in the
    /// outcome and leave the coin pending.
    pub async fn estimate_pending<A, P>(
        &self,
        appraiser: &A,
        pipeline: &BatchPipeline,
        progress: P,
    ) -> Result<BatchOutcome<Coin, Coin>>
    where
        A: Appraiser,
        P: FnMut(Progress),
    {
        let pending = self.run(|d| d.coins().pending_valuation()).await?;
        tracing::info!(count = pending.len(), "Starting bulk valuation");

        let outcome = pipeline
            .run(pending, |coin| self.value_and_store(appraiser, coin), progress)
            .await;

        tracing::info!(
            valued = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            cancelled = outcome.cancelled,
            "Bulk valuation finished"
        );
        Ok(outcome)
    }

    /// Appraise one coin and write the valuation.
    ///
    /// The write happens in the same poll that sees the appraisal finish,
    /// with no await in between. A deadline or cancellation that wins the
    /// race therefore drops the future before anything is stored, and a
    /// coin reported as failed is never valued in the store.
    async fn value_and_store<A: Appraiser>(&self, appraiser: &A, mut coin: Coin) -> Result<Coin> {
        let valuation = appraiser.appraise(&coin).await?;
        coin.apply_valuation(&valuation, &models::timestamp_now());
        let db = self
            .inner
            .lock()
            .map_err(|_| NumismaError::InvalidArgument("catalog lock poisoned".into()))?;
        db.coins().put(&coin)?;
        Ok(coin)
    }

    // -- Import ------------------------------------------------------------

    /// Normalize spreadsheet rows into coins without storing them.
    ///
    /// Broken rows are split off first. The rest go through `mapper` in
    /// chunks; every returned fragment is completed with a fresh id and
    /// timestamp.
    pub async fn prepare_import<M, P>(
        &self,
        rows: Vec<RawRow>,
        mapper: &M,
        pipeline: &BatchPipeline,
        progress: P,
    ) -> ImportReport
    where
        M: FragmentMapper,
        P: FnMut(Progress),
    {
        let normalizer = Normalizer::new();
        let (valid, broken) = normalizer.partition(rows);
        if !broken.is_empty() {
            tracing::warn!(count = broken.len(), "Rows missing year and denomination set aside");
        }

        let outcome = pipeline
            .run_chunked(valid, |chunk| async move { mapper.map_rows(&chunk).await }, progress)
            .await;

        let coins = outcome
            .succeeded
            .iter()
            .map(|fragment| normalizer.complete(fragment, Identity::fresh()))
            .collect();

        ImportReport {
            coins,
            broken,
            failed: outcome.failed,
            cancelled: outcome.cancelled,
        }
    }

    /// Normalize spreadsheet rows and bulk-store the resulting coins.
    pub async fn import_rows<M, P>(
        &self,
        rows: Vec<RawRow>,
        mapper: &M,
        pipeline: &BatchPipeline,
        progress: P,
    ) -> Result<ImportReport>
    where
        M: FragmentMapper,
        P: FnMut(Progress),
    {
        let report = self.prepare_import(rows, mapper, pipeline, progress).await;
        let coins = report.coins.clone();
        self.run(move |d| d.coins().put_many(&coins)).await?;
        tracing::info!(imported = report.coins.len(), broken = report.broken.len(), "Import stored");
        Ok(report)
    }

    /// Consume the wrapper and close the catalog once no clones remain.
    pub async fn close(self) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            let db = self
                .inner
                .lock()
                .map_err(|_| NumismaError::InvalidArgument("catalog lock poisoned".into()))?;
            drop(db);
            Ok(())
        })
        .await
        .map_err(|e| NumismaError::InvalidArgument(format!("Task join error: {e}")))?
    }
}
