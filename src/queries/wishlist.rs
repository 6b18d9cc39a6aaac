//! Wishlist queries.

use crate::error::Result;
use crate::matching::{self, OwnershipMatch, WishlistFilter};
use crate::models::{Coin, WishlistItem};
use crate::store::{Collection, RecordStore};

/// Query interface for the `wishlist` collection.
pub struct WishlistQuery<'a> {
    store: &'a RecordStore,
}

impl<'a> WishlistQuery<'a> {
    /// Create a new `WishlistQuery` bound to the given store.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<WishlistItem>> {
        self.store.get_all()
    }

    pub fn get(&self, id: &str) -> Result<Option<WishlistItem>> {
        self.store.get(id)
    }

    pub fn count(&self) -> Result<usize> {
        self.store.count(Collection::Wishlist)
    }

    pub fn put(&self, item: &WishlistItem) -> Result<()> {
        self.store.put(item)
    }

    pub fn put_many(&self, items: &[WishlistItem]) -> Result<()> {
        self.store.put_many(items)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(Collection::Wishlist, id)
    }

    pub fn delete_many(&self, ids: &[&str]) -> Result<()> {
        self.store.delete_many(Collection::Wishlist, ids)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear(Collection::Wishlist)
    }

    /// Wishlist items already present in the coin collection.
    pub fn ownership(&self) -> Result<Vec<OwnershipMatch>> {
        let coins: Vec<Coin> = self.store.get_all()?;
        Ok(matching::match_ownership(&coins, &self.list()?))
    }

    /// Items passing the wishlist screen's budget and ownership filters.
    pub fn filtered(&self, filter: &WishlistFilter) -> Result<Vec<WishlistItem>> {
        let coins: Vec<Coin> = self.store.get_all()?;
        let items = self.list()?;
        Ok(filter.apply(&items, &coins).into_iter().cloned().collect())
    }
}
