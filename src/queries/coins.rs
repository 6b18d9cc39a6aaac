//! Coin collection queries.

use crate::error::{NumismaError, Result};
use crate::inventory::{self, InventoryFilter, InventoryStats};
use crate::models::{self, Coin, InventoryStatus, Valuation};
use crate::store::{Collection, RecordStore};
use crate::view::{self, CollectionSummary, SortConfig};

// ---------------------------------------------------------------------------
// CoinQuery
// ---------------------------------------------------------------------------

/// Query interface for the `coins` collection.
pub struct CoinQuery<'a> {
    store: &'a RecordStore,
}

impl<'a> CoinQuery<'a> {
    /// Create a new `CoinQuery` bound to the given store.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    // -- Reads -------------------------------------------------------------

    /// Every coin, ordered by id.
    pub fn list(&self) -> Result<Vec<Coin>> {
        self.store.get_all()
    }

    /// Every coin in table order for the given sort config.
    pub fn list_sorted(&self, config: SortConfig) -> Result<Vec<Coin>> {
        let mut coins = self.list()?;
        view::sort_coins(&mut coins, config);
        Ok(coins)
    }

    /// Coins matching the table's free-text search, sorted.
    pub fn search(&self, term: &str, config: SortConfig) -> Result<Vec<Coin>> {
        let mut coins: Vec<Coin> = self
            .list()?
            .into_iter()
            .filter(|c| view::matches_search(c, term))
            .collect();
        view::sort_coins(&mut coins, config);
        Ok(coins)
    }

    pub fn get(&self, id: &str) -> Result<Option<Coin>> {
        self.store.get(id)
    }

    pub fn count(&self) -> Result<usize> {
        self.store.count(Collection::Coins)
    }

    /// Coins that have never been valued.
    pub fn pending_valuation(&self) -> Result<Vec<Coin>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(Coin::is_pending_valuation)
            .collect())
    }

    pub fn summary(&self) -> Result<CollectionSummary> {
        Ok(view::summarize(&self.list()?))
    }

    // -- Writes ------------------------------------------------------------

    /// Insert or replace a coin.
    pub fn put(&self, coin: &Coin) -> Result<()> {
        self.store.put(coin)
    }

    /// Insert or replace many coins in one transaction.
    pub fn put_many(&self, coins: &[Coin]) -> Result<()> {
        self.store.put_many(coins)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(Collection::Coins, id)
    }

    pub fn delete_many(&self, ids: &[&str]) -> Result<()> {
        self.store.delete_many(Collection::Coins, ids)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear(Collection::Coins)
    }

    /// Store a valuation result on a coin and return the updated record.
    pub fn apply_valuation(&self, id: &str, valuation: &Valuation) -> Result<Coin> {
        let mut coin = self.require(id)?;
        coin.apply_valuation(valuation, &models::timestamp_now());
        self.store.put(&coin)?;
        Ok(coin)
    }

    // -- Inventory ---------------------------------------------------------

    /// Set a coin's audit status, stamping `lastInventoried`.
    pub fn set_inventory_status(&self, id: &str, status: InventoryStatus) -> Result<Coin> {
        let coin = inventory::with_status(&self.require(id)?, status, &models::timestamp_now());
        self.store.put(&coin)?;
        Ok(coin)
    }

    /// Mark every coin on the filtered audit sheet as accounted for.
    ///
    /// Returns the number of coins written.
    pub fn mark_all_accounted(&self, filter: &InventoryFilter) -> Result<usize> {
        let coins = self.list()?;
        let updated = inventory::mark_all_accounted(filter.apply(&coins), &models::timestamp_now());
        self.store.put_many(&updated)?;
        tracing::info!(count = updated.len(), "Marked coins accounted for");
        Ok(updated.len())
    }

    /// Audit tallies over the filtered sheet.
    pub fn inventory_stats(&self, filter: &InventoryFilter) -> Result<InventoryStats> {
        let coins = self.list()?;
        Ok(inventory::stats(filter.apply(&coins)))
    }

    fn require(&self, id: &str) -> Result<Coin> {
        self.get(id)?
            .ok_or_else(|| NumismaError::NotFound(format!("coin {}", id)))
    }
}
