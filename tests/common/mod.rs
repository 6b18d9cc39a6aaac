//! Shared test fixtures for the catalog integration tests.
//!
//! Provides `setup_sample_db()`, an in-memory catalog populated with a few
//! coins and wishlist items, plus mock enrichment seams.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use numisma::models::{Certification, Coin, Priority, Source, Valuation, WishlistItem};
use numisma::normalize::RawRow;
use numisma::{Appraiser, FragmentMapper, Numisma, NumismaError, Result};

/// In-memory catalog with three coins and two wishlist items.
///
/// Coin `c2` is already valued; `c1` and `c3` are pending.
pub fn setup_sample_db() -> Numisma {
    let db = Numisma::builder().in_memory(true).build().unwrap();
    db.coins().put_many(&sample_coins()).unwrap();
    db.wishlist().put_many(&sample_wishlist()).unwrap();
    db
}

/// Catalog on disk inside a temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub fn setup_disk_db() -> (Numisma, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let db = Numisma::builder().data_dir(tmp_dir.path()).build().unwrap();
    db.coins().put_many(&sample_coins()).unwrap();
    db.wishlist().put_many(&sample_wishlist()).unwrap();
    (db, tmp_dir)
}

pub fn sample_coins() -> Vec<Coin> {
    vec![
        Coin {
            id: "c1".into(),
            country: "United States".into(),
            year: "1964".into(),
            mint_mark: Some("D".into()),
            denomination: "Half Dollar".into(),
            series: Some("Kennedy Half Dollars".into()),
            condition: "XF".into(),
            purchase_cost: Some(12.0),
            storage_location: Some("Safe".into()),
            date_added: "2024-01-01T00:00:00.000Z".into(),
            ..Coin::default()
        },
        Coin {
            id: "c2".into(),
            country: "Canada".into(),
            year: "1967".into(),
            denomination: "Dollar".into(),
            condition: "MS-63".into(),
            certification: Some(Certification {
                service: "PCGS".into(),
                serial_number: "998877".into(),
                grade: "MS-64".into(),
            }),
            purchase_cost: Some(40.0),
            estimated_value_min: Some(35.0),
            estimated_value_max: Some(55.0),
            valuation_date: Some("2024-02-01T00:00:00.000Z".into()),
            sources: Some(vec![Source {
                title: "Auction".into(),
                uri: "https://example.com".into(),
            }]),
            date_added: "2024-01-02T00:00:00.000Z".into(),
            ..Coin::default()
        },
        Coin {
            id: "c3".into(),
            country: "United States".into(),
            year: "1921".into(),
            denomination: "Morgan Dollar".into(),
            design: Some("Liberty Head".into()),
            condition: "VF".into(),
            quantity: 2,
            purchase_cost: Some(30.0),
            date_added: "2024-01-03T00:00:00.000Z".into(),
            ..Coin::default()
        },
    ]
}

pub fn sample_wishlist() -> Vec<WishlistItem> {
    vec![
        WishlistItem {
            id: "w1".into(),
            country: "United States".into(),
            denomination: "Half Dollar".into(),
            series: Some("kennedy".into()),
            max_price: Some(20.0),
            priority: Priority::High,
            ..WishlistItem::default()
        },
        WishlistItem {
            id: "w2".into(),
            country: "United States".into(),
            year: Some("1909".into()),
            denomination: "Cent".into(),
            max_price: Some(900.0),
            ..WishlistItem::default()
        },
    ]
}

pub fn row(value: serde_json::Value) -> RawRow {
    value.as_object().cloned().unwrap()
}

// ---------------------------------------------------------------------------
// Mock seams
// ---------------------------------------------------------------------------

/// Appraiser that values every coin at `$10-$20` except the ids in `fail`.
/// Records the ids it was asked about, in call order.
#[derive(Default)]
pub struct MockAppraiser {
    pub fail: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockAppraiser {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            fail: ids.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Appraiser for MockAppraiser {
    async fn appraise(&self, coin: &Coin) -> Result<Valuation> {
        self.calls.lock().unwrap().push(coin.id.clone());
        if self.fail.contains(&coin.id) {
            return Err(NumismaError::Enrichment(format!("no market data for {}", coin.id)));
        }
        Ok(Valuation {
            min: 10.0,
            max: 20.0,
            face_value: Some(1.0),
            notes: "steady demand".into(),
            sources: vec![],
        })
    }
}

/// Row mapper that fails any chunk containing a row whose `Country` is
/// `"FAIL"`, and otherwise passes rows through unchanged.
pub struct MockMapper;

impl FragmentMapper for MockMapper {
    async fn map_rows(&self, rows: &[RawRow]) -> Result<Vec<RawRow>> {
        if rows.iter().any(|r| r.get("Country").and_then(|v| v.as_str()) == Some("FAIL")) {
            return Err(NumismaError::Enrichment("model returned garbage".into()));
        }
        Ok(rows.to_vec())
    }
}
