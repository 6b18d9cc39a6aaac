//! In-memory working copy of the catalog.
//!
//! A [`Session`] loads both collections once and serves reads from memory.
//! Every mutation goes to the store first; the in-memory copy changes only
//! after the write succeeds, so the two never disagree. The session also
//! tracks whether anything changed since the last backup or restore.

use std::path::{Path, PathBuf};

use crate::backup::{self, BackupSnapshot, RestoreSummary};
use crate::error::{NumismaError, Result};
use crate::models::{self, Coin, InventoryStatus, Valuation, WishlistItem};
use crate::Numisma;

pub struct Session {
    db: Numisma,
    coins: Vec<Coin>,
    wishlist: Vec<WishlistItem>,
    unsaved: bool,
}

impl Session {
    /// Load both collections.
    ///
    /// A failed load is logged and the session starts empty; the store
    /// stays usable for later writes.
    pub fn open(db: Numisma) -> Self {
        let (coins, wishlist) = match load(&db) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load collections; starting empty");
                (Vec::new(), Vec::new())
            }
        };
        tracing::debug!(coins = coins.len(), wishlist = wishlist.len(), "Session opened");
        Self {
            db,
            coins,
            wishlist,
            unsaved: false,
        }
    }

    /// Re-read both collections from the store.
    pub fn reload(&mut self) -> Result<()> {
        let (coins, wishlist) = load(&self.db)?;
        self.coins = coins;
        self.wishlist = wishlist;
        Ok(())
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn wishlist(&self) -> &[WishlistItem] {
        &self.wishlist
    }

    pub fn coin(&self, id: &str) -> Option<&Coin> {
        self.coins.iter().find(|c| c.id == id)
    }

    /// True when records changed since the last backup or restore.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn db(&self) -> &Numisma {
        &self.db
    }

    pub fn into_inner(self) -> Numisma {
        self.db
    }

    // -- Coins -------------------------------------------------------------

    /// Insert or replace a coin. New coins are appended.
    pub fn save_coin(&mut self, coin: Coin) -> Result<()> {
        self.db.coins().put(&coin)?;
        upsert_local(&mut self.coins, coin, |c| c.id.as_str());
        self.unsaved = true;
        Ok(())
    }

    /// Append imported coins in one transaction.
    pub fn import_coins(&mut self, coins: Vec<Coin>) -> Result<()> {
        if coins.is_empty() {
            return Ok(());
        }
        self.db.coins().put_many(&coins)?;
        for coin in coins {
            upsert_local(&mut self.coins, coin, |c| c.id.as_str());
        }
        self.unsaved = true;
        Ok(())
    }

    pub fn delete_coins(&mut self, ids: &[&str]) -> Result<()> {
        self.db.coins().delete_many(ids)?;
        self.coins.retain(|c| !ids.contains(&c.id.as_str()));
        self.unsaved = true;
        Ok(())
    }

    /// Store a valuation on a coin held by this session.
    pub fn apply_valuation(&mut self, id: &str, valuation: &Valuation) -> Result<&Coin> {
        let mut coin = self.require_coin(id)?.clone();
        coin.apply_valuation(valuation, &models::timestamp_now());
        self.save_coin(coin)?;
        self.require_coin(id)
    }

    pub fn set_inventory_status(&mut self, id: &str, status: InventoryStatus) -> Result<()> {
        let coin = crate::inventory::with_status(self.require_coin(id)?, status, &models::timestamp_now());
        self.save_coin(coin)
    }

    fn require_coin(&self, id: &str) -> Result<&Coin> {
        self.coin(id)
            .ok_or_else(|| NumismaError::NotFound(format!("coin {}", id)))
    }

    // -- Wishlist ----------------------------------------------------------

    pub fn save_wishlist_item(&mut self, item: WishlistItem) -> Result<()> {
        self.db.wishlist().put(&item)?;
        upsert_local(&mut self.wishlist, item, |w| w.id.as_str());
        self.unsaved = true;
        Ok(())
    }

    pub fn delete_wishlist_item(&mut self, id: &str) -> Result<()> {
        self.db.wishlist().delete(id)?;
        self.wishlist.retain(|w| w.id != id);
        self.unsaved = true;
        Ok(())
    }

    // -- Backup and restore ------------------------------------------------

    /// Snapshot of the session's records; clears the unsaved flag.
    pub fn backup(&mut self) -> BackupSnapshot {
        self.unsaved = false;
        BackupSnapshot::new(self.coins.clone(), self.wishlist.clone())
    }

    /// Write a dated backup file into `dir`; clears the unsaved flag.
    pub fn save_backup<P: AsRef<Path>>(&mut self, dir: P) -> Result<PathBuf> {
        let snapshot = BackupSnapshot::new(self.coins.clone(), self.wishlist.clone());
        let path = dir
            .as_ref()
            .join(backup::backup_filename(chrono::Utc::now().date_naive()));
        backup::write_file(&path, &snapshot.encode()?)?;
        self.unsaved = false;
        Ok(path)
    }

    /// Replace store and session contents with a backup.
    ///
    /// Invalid text is rejected before anything changes.
    pub fn restore(&mut self, text: &str) -> Result<RestoreSummary> {
        let decoded = backup::decode(text)?;
        let summary = match backup::apply(self.db.store(), &decoded) {
            Ok(summary) => summary,
            Err(e) => {
                // The store may be partially restored; resync what it holds.
                if let Err(reload) = self.reload() {
                    tracing::error!(error = %reload, "Reload after failed restore also failed");
                }
                return Err(e);
            }
        };
        self.coins = decoded.coins;
        self.wishlist = decoded.wishlist;
        self.unsaved = false;
        Ok(summary)
    }
}

fn load(db: &Numisma) -> Result<(Vec<Coin>, Vec<WishlistItem>)> {
    Ok((db.coins().list()?, db.wishlist().list()?))
}

fn upsert_local<T>(items: &mut Vec<T>, record: T, id: impl Fn(&T) -> &str) {
    match items.iter().position(|existing| id(existing) == id(&record)) {
        Some(pos) => items[pos] = record,
        None => items.push(record),
    }
}
