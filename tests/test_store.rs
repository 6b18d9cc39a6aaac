//! Record store integration tests against in-memory and on-disk databases.

mod common;

use numisma::models::{Coin, WishlistItem};
use numisma::store::{Collection, RecordStore};
use numisma::NumismaError;

fn coin(id: &str, denomination: &str) -> Coin {
    Coin {
        id: id.into(),
        country: "United States".into(),
        year: "2000".into(),
        denomination: denomination.into(),
        ..Coin::default()
    }
}

// ---------------------------------------------------------------------------
// get_all / get
// ---------------------------------------------------------------------------

#[test]
fn get_all_returns_records_ordered_by_id() {
    let store = RecordStore::open_in_memory().unwrap();
    store.put_many(&[coin("b", "Dime"), coin("c", "Cent"), coin("a", "Nickel")]).unwrap();

    let ids: Vec<String> = store.get_all::<Coin>().unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn get_returns_none_for_unknown_id() {
    let store = RecordStore::open_in_memory().unwrap();
    assert!(store.get::<Coin>("missing").unwrap().is_none());
}

#[test]
fn collections_are_independent() {
    let db = common::setup_sample_db();
    let store = db.store();
    assert_eq!(store.count(Collection::Coins).unwrap(), 3);
    assert_eq!(store.count(Collection::Wishlist).unwrap(), 2);
    assert!(store.get::<WishlistItem>("c1").unwrap().is_none());
}

#[test]
fn unreadable_rows_are_skipped() {
    let store = RecordStore::open_in_memory().unwrap();
    store.put(&coin("good", "Dime")).unwrap();
    store
        .raw()
        .execute_batch("INSERT INTO coins (id, body) VALUES ('bad', 'not json')")
        .unwrap();

    let coins: Vec<Coin> = store.get_all().unwrap();
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].id, "good");
}

#[test]
fn blank_quantity_record_stays_readable() {
    let store = RecordStore::open_in_memory().unwrap();
    store
        .raw()
        .execute_batch(
            r#"INSERT INTO coins (id, body) VALUES ('q', '{"id":"q","year":"1990","denomination":"Cent","quantity":null}')"#,
        )
        .unwrap();

    let coins: Vec<Coin> = store.get_all().unwrap();
    assert_eq!(coins.len(), 1);
    assert_eq!(coins[0].quantity, 1);
}

// ---------------------------------------------------------------------------
// put / put_many
// ---------------------------------------------------------------------------

#[test]
fn upsert_is_idempotent() {
    let store = RecordStore::open_in_memory().unwrap();
    let c = coin("x", "Quarter");
    store.put(&c).unwrap();
    store.put(&c).unwrap();

    assert_eq!(store.count(Collection::Coins).unwrap(), 1);
    assert_eq!(store.get::<Coin>("x").unwrap(), Some(c));
}

#[test]
fn upsert_replaces_whole_record() {
    let store = RecordStore::open_in_memory().unwrap();
    store
        .put(&Coin {
            series: Some("State Quarters".into()),
            ..coin("x", "Quarter")
        })
        .unwrap();
    store.put(&coin("x", "Quarter")).unwrap();

    let stored: Coin = store.get("x").unwrap().unwrap();
    assert!(stored.series.is_none());
}

#[test]
fn put_many_keeps_last_duplicate() {
    let store = RecordStore::open_in_memory().unwrap();
    store.put_many(&[coin("x", "First"), coin("x", "Second")]).unwrap();

    assert_eq!(store.count(Collection::Coins).unwrap(), 1);
    let stored: Coin = store.get("x").unwrap().unwrap();
    assert_eq!(stored.denomination, "Second");
}

#[test]
fn put_many_rejects_missing_id_and_writes_nothing() {
    let store = RecordStore::open_in_memory().unwrap();
    let err = store.put_many(&[coin("ok", "Dime"), coin("", "Cent")]).unwrap_err();
    assert!(matches!(err, NumismaError::InvalidArgument(_)));
    assert_eq!(store.count(Collection::Coins).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// delete / clear
// ---------------------------------------------------------------------------

#[test]
fn delete_missing_id_is_not_an_error() {
    let store = RecordStore::open_in_memory().unwrap();
    store.delete(Collection::Coins, "nope").unwrap();
}

#[test]
fn delete_many_removes_only_listed_ids() {
    let db = common::setup_sample_db();
    db.store().delete_many(Collection::Coins, &["c1", "c3"]).unwrap();

    let ids: Vec<String> = db.coins().list().unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["c2"]);
}

#[test]
fn clear_empties_one_collection() {
    let db = common::setup_sample_db();
    db.store().clear(Collection::Coins).unwrap();
    assert_eq!(db.coins().count().unwrap(), 0);
    assert_eq!(db.wishlist().count().unwrap(), 2);
}

// ---------------------------------------------------------------------------
// settings
// ---------------------------------------------------------------------------

#[test]
fn settings_round_trip_any_json() {
    let store = RecordStore::open_in_memory().unwrap();
    assert!(store.get_setting("theme").unwrap().is_none());

    store.set_setting("theme", &serde_json::json!({"dark": true})).unwrap();
    store.set_setting("theme", &serde_json::json!("light")).unwrap();
    assert_eq!(store.get_setting("theme").unwrap(), Some(serde_json::json!("light")));
}

// ---------------------------------------------------------------------------
// on disk
// ---------------------------------------------------------------------------

#[test]
fn records_survive_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("catalog.duckdb");
    {
        let store = RecordStore::open(&path).unwrap();
        store.put(&coin("keep", "Dollar")).unwrap();
    }
    let store = RecordStore::open(&path).unwrap();
    assert_eq!(store.get::<Coin>("keep").unwrap().unwrap().denomination, "Dollar");
    assert!(store.location().ends_with("catalog.duckdb"));
}

#[test]
fn in_memory_location_is_marked() {
    let store = RecordStore::open_in_memory().unwrap();
    assert_eq!(store.location(), ":memory:");
}
