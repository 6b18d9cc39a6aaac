//! Full-workspace backup and restore.
//!
//! A backup is one JSON document holding every coin and wishlist item:
//!
//! ```json
//! { "version": "2.0", "timestamp": "...", "coins": [...], "wishlist": [...] }
//! ```
//!
//! Restore also accepts the legacy format, a bare array of coins. Decoding
//! happens entirely before the store is touched, so a rejected file leaves
//! the workspace as it was.

use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config;
use crate::error::{NumismaError, Result};
use crate::models::{self, Coin, WishlistItem};
use crate::store::{Collection, RecordStore};

// ---------------------------------------------------------------------------
// BackupSnapshot
// ---------------------------------------------------------------------------

/// The versioned backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub version: String,
    pub timestamp: String,
    pub coins: Vec<Coin>,
    pub wishlist: Vec<WishlistItem>,
}

impl BackupSnapshot {
    /// Snapshot of the given records, stamped with the current time.
    pub fn new(coins: Vec<Coin>, wishlist: Vec<WishlistItem>) -> Self {
        Self {
            version: config::BACKUP_VERSION.to_string(),
            timestamp: models::timestamp_now(),
            coins,
            wishlist,
        }
    }

    /// Snapshot of everything currently in the store.
    pub fn capture(store: &RecordStore) -> Result<Self> {
        Ok(Self::new(store.get_all()?, store.get_all()?))
    }

    /// Pretty-printed JSON (two-space indent).
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Which document shape a backup was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    /// `{version, timestamp, coins, wishlist}`.
    Full,
    /// A bare array of coins.
    Legacy,
}

/// Records decoded from a backup, not yet applied to any store.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBackup {
    pub format: BackupFormat,
    pub coins: Vec<Coin>,
    pub wishlist: Vec<WishlistItem>,
}

/// Counts of records written by a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub coins: usize,
    pub wishlist: usize,
}

impl DecodedBackup {
    pub fn summary(&self) -> RestoreSummary {
        RestoreSummary {
            coins: self.coins.len(),
            wishlist: self.wishlist.len(),
        }
    }
}

/// Parse backup text into records.
///
/// An object with a `coins` array is the full format; its `wishlist` is
/// optional and anything other than an array reads as empty. A top-level
/// array is the legacy format. Everything else, including malformed JSON
/// and elements that are not records with an id, is a
/// [`NumismaError::Format`].
pub fn decode(text: &str) -> Result<DecodedBackup> {
    let data: Value = serde_json::from_str(text).map_err(|e| NumismaError::Format(format!("invalid JSON: {e}")))?;

    match data {
        Value::Object(mut doc) => match doc.remove("coins") {
            Some(Value::Array(coins)) => {
                let wishlist = match doc.remove("wishlist") {
                    Some(Value::Array(items)) => decode_records("wishlist", items)?,
                    _ => Vec::new(),
                };
                Ok(DecodedBackup {
                    format: BackupFormat::Full,
                    coins: decode_records("coins", coins)?,
                    wishlist,
                })
            }
            _ => Err(NumismaError::Format("expected a `coins` array".into())),
        },
        Value::Array(coins) => Ok(DecodedBackup {
            format: BackupFormat::Legacy,
            coins: decode_records("coins", coins)?,
            wishlist: Vec::new(),
        }),
        _ => Err(NumismaError::Format(
            "expected a backup object or an array of coins".into(),
        )),
    }
}

fn decode_records<T: DeserializeOwned>(label: &str, items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let has_id = item
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.is_empty());
            if !has_id {
                return Err(NumismaError::Format(format!("{label}[{index}] has no id")));
            }
            serde_json::from_value(item).map_err(|e| NumismaError::Format(format!("{label}[{index}]: {e}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Replace the store's contents with a decoded backup.
///
/// Destructive: both collections are cleared, then bulk-written. A storage
/// failure after the clear leaves the store partially restored.
pub fn apply(store: &RecordStore, backup: &DecodedBackup) -> Result<RestoreSummary> {
    store.clear(Collection::Coins)?;
    store.clear(Collection::Wishlist)?;
    store.put_many(&backup.coins)?;
    store.put_many(&backup.wishlist)?;

    let summary = backup.summary();
    tracing::info!(
        coins = summary.coins,
        wishlist = summary.wishlist,
        format = ?backup.format,
        "Restored backup"
    );
    Ok(summary)
}

/// Decode `text` and, only if it is valid, replace the store's contents.
pub fn restore(store: &RecordStore, text: &str) -> Result<RestoreSummary> {
    let backup = decode(text)?;
    apply(store, &backup)
}

// ---------------------------------------------------------------------------
// Backup files
// ---------------------------------------------------------------------------

/// `Numisma_Full_Backup_<YYYY-MM-DD>.json`
pub fn backup_filename(date: NaiveDate) -> String {
    format!("Numisma_Full_Backup_{}.json", date.format("%Y-%m-%d"))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Write backup text to `path`, gzip-compressed when it ends in `.gz`.
///
/// The file is written to a temporary sibling and renamed into place, so
/// an interrupted write never leaves a truncated backup behind.
pub fn write_file(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()?;
    } else {
        tmp.write_all(text.as_bytes())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| NumismaError::Io(e.error))?;

    tracing::debug!(path = %path.display(), bytes = text.len(), "Wrote backup file");
    Ok(())
}

/// Read backup text from `path`, decompressing `.gz` files.
pub fn read_file(path: &Path) -> Result<String> {
    let mut contents = String::new();
    if is_gzip(path) {
        let file = fs::File::open(path)?;
        let mut decoder = BufReader::new(GzDecoder::new(BufReader::new(file)));
        decoder.read_to_string(&mut contents)?;
    } else {
        contents = fs::read_to_string(path)?;
    }
    Ok(contents)
}
