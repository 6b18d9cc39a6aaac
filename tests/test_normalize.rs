//! Spreadsheet row normalization tests.

mod common;

use common::row;
use numisma::normalize::{Identity, Normalizer};
use serde_json::json;

fn fixed() -> Identity {
    Identity {
        id: "id-1".into(),
        date_added: "2024-05-01T12:00:00.000Z".into(),
    }
}

// ---------------------------------------------------------------------------
// defaults
// ---------------------------------------------------------------------------

#[test]
fn sparse_row_gets_defaults() {
    let coin = Normalizer::new().normalize_row(&row(json!({"Program/Series": "Test", "Cost": "abc"})));

    assert_eq!(coin.year, "Unknown");
    assert_eq!(coin.denomination, "");
    assert_eq!(coin.country, "United States");
    assert_eq!(coin.condition, "Circulated");
    assert_eq!(coin.series.as_deref(), Some("Test"));
    assert_eq!(coin.purchase_cost, Some(0.0));
    assert_eq!(coin.quantity, 1);
    assert_eq!(coin.currency, "USD");
    assert!(!coin.id.is_empty());
    assert!(!coin.date_added.is_empty());
    assert!(coin.is_pending_valuation());
}

#[test]
fn fresh_identities_differ() {
    let n = Normalizer::new();
    let r = row(json!({"Year": "1964", "Denomination": "Dime"}));
    assert_ne!(n.normalize_row(&r).id, n.normalize_row(&r).id);
}

#[test]
fn unknown_headers_are_dropped() {
    let coin = Normalizer::new().complete(
        &row(json!({"Year": "1990", "Denomination": "Cent", "Favourite Colour": "blue"})),
        fixed(),
    );
    assert!(coin.extra.is_empty());
    assert_eq!(coin.denomination, "Cent");
}

// ---------------------------------------------------------------------------
// full template row
// ---------------------------------------------------------------------------

#[test]
fn template_row_maps_every_column() {
    let rows = numisma::export::template_row();
    let raw: numisma::RawRow = rows.into_iter().map(|(h, v)| (h.to_string(), v)).collect();
    let coin = Normalizer::new().complete(&raw, fixed());

    assert_eq!(coin.id, "id-1");
    assert_eq!(coin.date_added, "2024-05-01T12:00:00.000Z");
    assert_eq!(coin.country, "USA");
    assert_eq!(coin.year, "1964");
    assert_eq!(coin.mint_mark.as_deref(), Some("P"));
    assert_eq!(coin.theme.as_deref(), Some("Silver"));
    assert_eq!(coin.surface_quality.as_deref(), Some("Sharp, full luster"));
    assert_eq!(coin.purchase_cost, Some(25.0));
    assert_eq!(coin.melt_value, Some(5.4));
    assert_eq!(coin.retailer_item_no.as_deref(), Some("1413.6"));
    assert_eq!(coin.notes_legacy.as_deref(), Some("Standard Silver Quarter"));

    let cert = coin.certification.expect("certification");
    assert_eq!(cert.service, "PCGS");
    assert_eq!(cert.serial_number, "12345678");
    assert_eq!(cert.grade, "MS-65");
    assert_eq!(coin.condition, "MS-65");
}

#[test]
fn alternative_headers_are_accepted() {
    let coin = Normalizer::new().complete(
        &row(json!({" Date ": 1881, "Coin Type": "Morgan Dollar", "Grade": "AU-55"})),
        fixed(),
    );
    assert_eq!(coin.year, "1881");
    assert_eq!(coin.denomination, "Morgan Dollar");
    assert_eq!(coin.condition, "AU-55");
}

#[test]
fn export_header_outranks_loose_alias() {
    let coin = Normalizer::new().complete(
        &row(json!({"Denomination": "Dollar", "Coin Type": "Morgan", "Description": "Silver"})),
        fixed(),
    );
    assert_eq!(coin.denomination, "Dollar");

    let coin = Normalizer::new().complete(&row(json!({"year": "1900", "Year": "1901", "Date": "1902"})), fixed());
    assert_eq!(coin.year, "1900");

    // A blank better-ranked cell does not hide a filled alias.
    let coin = Normalizer::new().complete(&row(json!({"Year": " ", "Date": "1881"})), fixed());
    assert_eq!(coin.year, "1881");
}

#[test]
fn currency_formatted_cost_is_parsed() {
    let coin = Normalizer::new().complete(&row(json!({"Year": "2001", "Cost": "$1,250.00"})), fixed());
    assert_eq!(coin.purchase_cost, Some(1250.0));
}

#[test]
fn no_certification_without_service_or_serial() {
    let coin = Normalizer::new().complete(&row(json!({"Year": "2001", "Grading Service": ""})), fixed());
    assert!(coin.certification.is_none());
}

// ---------------------------------------------------------------------------
// broken rows
// ---------------------------------------------------------------------------

#[test]
fn rows_without_year_or_denomination_are_broken() {
    let n = Normalizer::new();
    let rows = vec![
        row(json!({"Year": "1964"})),
        row(json!({"Country": "Peru", "Cost": 4})),
        row(json!({"Denomination": "Nickel"})),
        row(json!({"Year": "", "Denomination": "  "})),
    ];

    let (valid, broken) = n.partition(rows);
    assert_eq!(valid.len(), 2);
    assert_eq!(broken.len(), 2);
    assert_eq!(broken[0]["Country"], "Peru");
}

#[test]
fn fixed_row_becomes_valid() {
    let n = Normalizer::new();
    let mut broken = row(json!({"Country": "Peru"}));
    assert!(n.fix_row(&mut broken, "1950", "").is_err());
    assert!(n.is_broken(&broken));

    n.fix_row(&mut broken, "1950", "Sol").unwrap();
    assert!(!n.is_broken(&broken));
    let coin = n.complete(&broken, fixed());
    assert_eq!(coin.country, "Peru");
    assert_eq!(coin.year, "1950");
    assert_eq!(coin.denomination, "Sol");
}
