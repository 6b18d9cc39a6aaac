//! DuckDB-backed record store for coins, wishlist items and settings.
//!
//! Each collection is a two-column table holding the record id and the
//! record serialized as JSON text. There are no secondary indices: callers
//! read a whole collection and filter or sort in memory.

use std::fmt;
use std::path::{Path, PathBuf};

use duckdb::{params, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{NumismaError, Result};
use crate::models::{Coin, WishlistItem};

// ---------------------------------------------------------------------------
// Collection / Record
// ---------------------------------------------------------------------------

/// The entity collections kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Coins,
    Wishlist,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Coins => "coins",
            Collection::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A record type persisted in one of the store's collections.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

impl Record for Coin {
    const COLLECTION: Collection = Collection::Coins;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for WishlistItem {
    const COLLECTION: Collection = Collection::Wishlist;

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Wraps a DuckDB connection holding the `coins`, `wishlist` and
/// `settings` tables.
pub struct RecordStore {
    conn: DuckDbConnection,
    path: Option<PathBuf>,
}

impl RecordStore {
    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Open (or create) a store backed by the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = DuckDbConnection::open(&path)?;
        let store = Self {
            conn,
            path: Some(path),
        };
        store.ensure_schema()?;
        tracing::debug!(path = %store.location(), "Opened record store");
        Ok(store)
    }

    /// Database file path, or `":memory:"` for an in-memory store.
    pub fn location(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS coins (id VARCHAR NOT NULL, body VARCHAR NOT NULL); \
             CREATE TABLE IF NOT EXISTS wishlist (id VARCHAR NOT NULL, body VARCHAR NOT NULL); \
             CREATE TABLE IF NOT EXISTS settings (key VARCHAR NOT NULL, value VARCHAR NOT NULL);",
        )?;
        Ok(())
    }

    // -- Reads -------------------------------------------------------------

    /// Read every record of a collection, ordered by id.
    ///
    /// Rows whose JSON no longer deserializes are logged and skipped so one
    /// damaged record does not hide the rest of the collection.
    pub fn get_all<T: Record>(&self) -> Result<Vec<T>> {
        let table = T::COLLECTION.table();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, body FROM {} ORDER BY id", table))?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let body: String = row.get(1)?;
            match serde_json::from_str::<T>(&body) {
                Ok(record) => out.push(record),
                Err(e) => tracing::warn!(%table, %id, error = %e, "Skipping unreadable record"),
            }
        }
        Ok(out)
    }

    /// Read one record by id.
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        let table = T::COLLECTION.table();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT body FROM {} WHERE id = ?", table))?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => {
                let body: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: Collection) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT COUNT(*) FROM {}", collection.table()))?;
        let mut rows = stmt.query([])?;
        let count: i64 = match rows.next()? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(count.max(0) as usize)
    }

    // -- Writes ------------------------------------------------------------

    /// Insert or replace one record.
    pub fn put<T: Record>(&self, record: &T) -> Result<()> {
        self.put_many(std::slice::from_ref(record))
    }

    /// Insert or replace many records in a single transaction.
    ///
    /// Either every record is written or none is. When the batch repeats an
    /// id, the later record wins.
    pub fn put_many<T: Record>(&self, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = T::COLLECTION.table();
        let bodies = records
            .iter()
            .map(|r| {
                if r.id().is_empty() {
                    return Err(NumismaError::InvalidArgument(format!(
                        "cannot store a {} record without an id",
                        table
                    )));
                }
                Ok((r.id(), serde_json::to_string(r)?))
            })
            .collect::<Result<Vec<_>>>()?;

        self.transaction(|conn| {
            let mut delete = conn.prepare(&format!("DELETE FROM {} WHERE id = ?", table))?;
            let mut insert = conn.prepare(&format!("INSERT INTO {} (id, body) VALUES (?, ?)", table))?;
            for (id, body) in &bodies {
                delete.execute(params![id])?;
                insert.execute(params![id, body])?;
            }
            Ok(())
        })?;

        tracing::debug!(%table, count = bodies.len(), "Upserted records");
        Ok(())
    }

    /// Delete one record. Deleting a missing id is not an error.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", collection.table()),
            params![id],
        )?;
        Ok(())
    }

    /// Delete several records in a single transaction.
    pub fn delete_many(&self, collection: Collection, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let table = collection.table();
        self.transaction(|conn| {
            let mut stmt = conn.prepare(&format!("DELETE FROM {} WHERE id = ?", table))?;
            for id in ids {
                stmt.execute(params![id])?;
            }
            Ok(())
        })
    }

    /// Remove every record from a collection.
    pub fn clear(&self, collection: Collection) -> Result<()> {
        self.conn
            .execute_batch(&format!("DELETE FROM {}", collection.table()))?;
        tracing::info!(table = %collection, "Cleared collection");
        Ok(())
    }

    // -- Settings ----------------------------------------------------------

    /// Read a setting value, if one was saved.
    pub fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => {
                let value: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&value)?))
            }
            None => Ok(None),
        }
    }

    /// Save a setting value, replacing any previous one. Values are not
    /// validated.
    pub fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.transaction(|conn| {
            conn.execute("DELETE FROM settings WHERE key = ?", params![key])?;
            conn.execute("INSERT INTO settings (key, value) VALUES (?, ?)", params![key, text])?;
            Ok(())
        })
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }

    /// Run `f` inside BEGIN/COMMIT, rolling back if it fails.
    fn transaction<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&DuckDbConnection) -> Result<()>,
    {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match f(&self.conn) {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::error!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
