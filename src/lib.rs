//! Numisma: a personal coin collection catalog for Rust.
//!
//! Keeps coins, wishlist items and settings in a local DuckDB record store,
//! imports spreadsheet rows through a header-alias normalizer, values coins
//! through a generative model behind a throttled batch pipeline, and backs
//! the whole workspace up to a single JSON document.
//!
//! # Quick start
//!
//! ```no_run
//! use numisma::Numisma;
//!
//! let db = Numisma::builder().build().unwrap();
//!
//! // Query coins
//! let pending = db.coins().pending_valuation().unwrap();
//!
//! // Back everything up
//! let path = db.save_backup(std::env::temp_dir()).unwrap();
//! ```

pub mod appraisal;
pub mod async_client;
pub mod backup;
pub mod config;
pub mod error;
pub mod export;
pub mod inventory;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod queries;
pub mod session;
pub mod store;
pub mod view;

pub use appraisal::{AliasMapper, Appraiser, FragmentMapper, GeminiClient, GeminiConfig};
pub use async_client::AsyncNumisma;
pub use backup::{BackupSnapshot, RestoreSummary};
pub use error::{NumismaError, Result};
pub use models::{Coin, Priority, Valuation, WishlistItem};
pub use normalize::{Normalizer, RawRow};
pub use pipeline::{BatchOutcome, BatchPipeline, Progress};
pub use session::Session;
pub use store::RecordStore;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// NumismaBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`Numisma`] instance.
///
/// Use [`Numisma::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](NumismaBuilder::build) to open the store.
#[derive(Debug, Clone)]
pub struct NumismaBuilder {
    data_dir: Option<PathBuf>,
    in_memory: bool,
    timeout: Duration,
}

impl Default for NumismaBuilder {
    fn default() -> Self {
        Self {
            data_dir: None,
            in_memory: false,
            timeout: Duration::from_secs(120),
        }
    }
}

impl NumismaBuilder {
    /// Set a custom data directory.
    ///
    /// If not set, the platform-appropriate local data directory is used
    /// (e.g. `~/.local/share/numisma` on Linux).
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep everything in memory; nothing is written to disk.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// HTTP timeout for valuation and normalization requests.
    ///
    /// Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open the record store, creating the data directory and tables on
    /// first use.
    pub fn build(self) -> Result<Numisma> {
        let store = if self.in_memory {
            RecordStore::open_in_memory()?
        } else {
            let dir = self.data_dir.unwrap_or_else(config::default_data_dir);
            RecordStore::open(dir.join(config::DATABASE_FILE))?
        };
        Ok(Numisma {
            store,
            timeout: self.timeout,
        })
    }
}

// ---------------------------------------------------------------------------
// Numisma
// ---------------------------------------------------------------------------

/// The main entry point for the catalog.
///
/// Owns the [`RecordStore`] and exposes per-collection query interfaces as
/// lightweight borrowing wrappers.
///
/// Created via [`Numisma::builder()`].
pub struct Numisma {
    store: RecordStore,
    timeout: Duration,
}

impl Numisma {
    /// Create a new builder for configuring the catalog.
    pub fn builder() -> NumismaBuilder {
        NumismaBuilder::default()
    }

    /// Wrap an already opened store.
    pub fn from_store(store: RecordStore) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(120),
        }
    }

    // -- Query accessors ---------------------------------------------------

    /// Access the coin query interface.
    pub fn coins(&self) -> queries::CoinQuery<'_> {
        queries::CoinQuery::new(&self.store)
    }

    /// Access the wishlist query interface.
    pub fn wishlist(&self) -> queries::WishlistQuery<'_> {
        queries::WishlistQuery::new(&self.store)
    }

    /// Access the settings query interface.
    pub fn settings(&self) -> queries::SettingsQuery<'_> {
        queries::SettingsQuery::new(&self.store)
    }

    // -- Enrichment --------------------------------------------------------

    /// Build a model client from the API key and model saved in settings.
    pub fn gemini_client(&self) -> Result<GeminiClient> {
        let cfg = self.settings().gemini_config()?.timeout(self.timeout);
        GeminiClient::new(cfg)
    }

    // -- Backup and restore ------------------------------------------------

    /// Snapshot every coin and wishlist item.
    pub fn backup(&self) -> Result<BackupSnapshot> {
        BackupSnapshot::capture(&self.store)
    }

    /// Write a dated backup file into `dir` and return its path.
    pub fn save_backup<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(backup::backup_filename(chrono::Utc::now().date_naive()));
        backup::write_file(&path, &self.backup()?.encode()?)?;
        tracing::info!(path = %path.display(), "Saved backup");
        Ok(path)
    }

    /// Replace the workspace with the contents of backup text.
    ///
    /// The text is fully decoded first; a rejected document leaves the
    /// store unchanged.
    pub fn restore(&self, text: &str) -> Result<RestoreSummary> {
        backup::restore(&self.store, text)
    }

    /// Replace the workspace with the contents of a backup file
    /// (`.json` or `.json.gz`).
    pub fn restore_file<P: AsRef<Path>>(&self, path: P) -> Result<RestoreSummary> {
        self.restore(&backup::read_file(path.as_ref())?)
    }

    // -- Utility -----------------------------------------------------------

    /// Consume the catalog and close the database.
    pub fn close(self) {
        drop(self);
    }

    /// Return a reference to the underlying [`RecordStore`].
    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Numisma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coins = self.coins().count().unwrap_or_default();
        let wishlist = self.wishlist().count().unwrap_or_default();
        write!(
            f,
            "Numisma(store={}, coins={}, wishlist={})",
            self.store.location(),
            coins,
            wishlist
        )
    }
}
