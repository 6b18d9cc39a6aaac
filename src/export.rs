//! Spreadsheet export rows.
//!
//! Rows are ordered `(header, value)` pairs ready for a sheet writer; the
//! workbook format itself is the writer's concern.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::config::COLLECTION_COLUMNS;
use crate::matching;
use crate::models::{Coin, Priority, WishlistItem};

/// One exported row, columns in sheet order.
pub type ExportRow = Vec<(&'static str, Value)>;

/// Sheet name used for the collection export.
pub const COLLECTION_SHEET: &str = "My Collection";
/// Sheet name used for the import template.
pub const TEMPLATE_SHEET: &str = "Enter Coins";
/// Sheet name used for the wishlist export.
pub const WISHLIST_SHEET: &str = "Coin Wishlist";

pub const TEMPLATE_FILENAME: &str = "Numisma_Import_Template.xlsx";
pub const WISHLIST_FILENAME: &str = "My_Coin_Wishlist.xlsx";

pub const OWNED_STATUS: &str = "IN COLLECTION";
pub const WANTED_STATUS: &str = "Wanted";

/// `Numisma_Export_<YYYY-MM-DD>.xlsx`
pub fn collection_export_filename(date: NaiveDate) -> String {
    format!("Numisma_Export_{}.xlsx", date.format("%Y-%m-%d"))
}

fn text(s: &Option<String>) -> Value {
    Value::String(s.clone().unwrap_or_default())
}

fn cell(coin: &Coin, field: &str) -> Value {
    let cert = coin.certification.as_ref();
    match field {
        "country" => Value::String(coin.country.clone()),
        "year" => Value::String(coin.year.clone()),
        "mintMark" => text(&coin.mint_mark),
        "denomination" => Value::String(coin.denomination.clone()),
        "quantity" => json!(coin.quantity),
        "series" => text(&coin.series),
        "theme" => text(&coin.theme),
        "condition" => Value::String(coin.condition.clone()),
        "surfaceQuality" => text(&coin.surface_quality),
        "certService" => Value::String(cert.map(|c| c.service.clone()).unwrap_or_default()),
        "certSerial" => Value::String(cert.map(|c| c.serial_number.clone()).unwrap_or_default()),
        "purchaseCost" => json!(coin.purchase_cost.unwrap_or(0.0)),
        "datePurchased" => text(&coin.date_purchased),
        "retailer" => text(&coin.retailer),
        "retailerItemNo" => text(&coin.retailer_item_no),
        "retailerInvoiceNo" => text(&coin.retailer_invoice_no),
        "metalContent" => text(&coin.metal_content),
        "meltValue" => json!(coin.melt_value.unwrap_or(0.0)),
        "personalNotes" => text(&coin.personal_notes),
        "personalRefNo" => text(&coin.personal_ref_no),
        "storageLocation" => text(&coin.storage_location),
        "varietyLegacy" => text(&coin.variety_legacy),
        "notesLegacy" => text(&coin.notes_legacy),
        _ => Value::Null,
    }
}

/// One row per coin with the 23 collection columns. Missing text exports
/// as `""` and missing amounts as `0`.
pub fn collection_rows(coins: &[Coin]) -> Vec<ExportRow> {
    coins
        .iter()
        .map(|coin| {
            COLLECTION_COLUMNS
                .iter()
                .map(|(header, field)| (*header, cell(coin, field)))
                .collect()
        })
        .collect()
}

/// The example row shipped in the blank import template.
pub fn template_row() -> ExportRow {
    let example = [
        json!("USA"),
        json!("1964"),
        json!("P"),
        json!("Quarter"),
        json!(1),
        json!("Washington Quarters"),
        json!("Silver"),
        json!("MS-65"),
        json!("Sharp, full luster"),
        json!("PCGS"),
        json!("12345678"),
        json!(25.0),
        json!("15 JAN 2024"),
        json!("Local Coin Shop"),
        json!("1413.6"),
        json!("JS050119"),
        json!("90% Silver"),
        json!(5.4),
        json!("Example entry"),
        json!("REF-001"),
        json!("Safe Deposit Box A"),
        json!("N/A"),
        json!("Standard Silver Quarter"),
    ];
    COLLECTION_COLUMNS
        .iter()
        .map(|(header, _)| *header)
        .zip(example)
        .collect()
}

fn or_dash(s: &Option<String>) -> Value {
    match s.as_deref() {
        Some(s) if !s.is_empty() => Value::String(s.to_string()),
        _ => Value::String("-".into()),
    }
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

/// Wishlist rows with an ownership `Status` column.
pub fn wishlist_rows(wishlist: &[WishlistItem], coins: &[Coin]) -> Vec<ExportRow> {
    wishlist
        .iter()
        .map(|item| {
            let owned = matching::owned_by(item, coins).is_some();
            let year = match item.year.as_deref() {
                Some(y) if !y.is_empty() => y.to_string(),
                _ => "Any".to_string(),
            };
            let budget = match item.max_price {
                Some(price) if price != 0.0 => json!(price),
                _ => json!("-"),
            };
            vec![
                ("Priority", json!(priority_label(item.priority))),
                ("Denomination", json!(item.denomination)),
                ("Year", json!(year)),
                ("Series / Program", or_dash(&item.series)),
                ("Design", or_dash(&item.design)),
                ("Target Condition", or_dash(&item.target_condition)),
                ("Budget ($)", budget),
                ("Status", json!(if owned { OWNED_STATUS } else { WANTED_STATUS })),
                ("Notes", or_dash(&item.notes)),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Identity, Normalizer, RawRow};

    #[test]
    fn template_row_has_every_column() {
        let row = template_row();
        assert_eq!(row.len(), 23);
        assert_eq!(row[0], ("Country", json!("USA")));
        assert_eq!(row[22].0, "Notes (Legacy)");
    }

    #[test]
    fn exported_row_reimports_through_normalizer() {
        let coin = Coin {
            id: "c1".into(),
            country: "Canada".into(),
            year: "1967".into(),
            denomination: "Dollar".into(),
            condition: "AU".into(),
            purchase_cost: Some(30.0),
            storage_location: Some("Drawer".into()),
            ..Coin::default()
        };
        let row: RawRow = collection_rows(std::slice::from_ref(&coin))
            .remove(0)
            .into_iter()
            .map(|(h, v)| (h.to_string(), v))
            .collect();

        let back = Normalizer::new().complete(
            &row,
            Identity {
                id: "c1".into(),
                date_added: coin.date_added.clone(),
            },
        );
        assert_eq!(back.country, "Canada");
        assert_eq!(back.year, "1967");
        assert_eq!(back.purchase_cost, Some(30.0));
        assert_eq!(back.storage_location.as_deref(), Some("Drawer"));
    }

    #[test]
    fn filename_embeds_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(collection_export_filename(date), "Numisma_Export_2024-03-09.xlsx");
    }
}
